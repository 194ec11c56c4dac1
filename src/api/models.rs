/// Whether a buildpack may be used for staging, as requested by the user.
///
/// `Unspecified` and `Disabled` are different requests: the first leaves the
/// choice to the platform default, the second explicitly turns staging off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionIntent {
    /// No preference; the platform applies its own default.
    #[default]
    Unspecified,
    /// Explicitly enabled.
    Enabled,
    /// Explicitly disabled.
    Disabled,
}

impl OptionIntent {
    /// The wire value for the `enabled` field, `None` when it must be omitted.
    #[must_use]
    pub fn as_enabled(self) -> Option<bool> {
        match self {
            Self::Unspecified => None,
            Self::Enabled => Some(true),
            Self::Disabled => Some(false),
        }
    }
}

/// A buildpack as returned by the platform after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buildpack {
    /// Platform-assigned identifier.
    pub guid: String,
    /// Unique buildpack name.
    pub name: String,
    /// Detection priority (lower is tried first).
    pub position: Option<i32>,
    /// Whether the buildpack is used for staging.
    pub enabled: Option<bool>,
    /// Whether the buildpack is locked against updates.
    pub locked: Option<bool>,
    /// Name of the uploaded artifact, if any bits are attached.
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_values() {
        assert_eq!(OptionIntent::Unspecified.as_enabled(), None);
        assert_eq!(OptionIntent::Enabled.as_enabled(), Some(true));
        assert_eq!(OptionIntent::Disabled.as_enabled(), Some(false));
    }

    #[test]
    fn test_default_is_unspecified() {
        assert_eq!(OptionIntent::default(), OptionIntent::Unspecified);
    }
}
