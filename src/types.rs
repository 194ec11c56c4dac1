/// Serializable output types.
use serde::{Deserialize, Serialize};

use crate::commands::DispatchError;

/// A structured error envelope for JSON error output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// Always `false`.
    pub ok: bool,
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail in the JSON error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (snake_case).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorOutput {
    /// Envelope for a failure with an explicit code.
    #[must_use]
    pub fn new(code: &str, message: String) -> Self {
        Self {
            ok: false,
            error: ErrorDetail {
                code: code.to_owned(),
                message,
            },
        }
    }

    /// Construct from a `DispatchError`.
    #[must_use]
    pub fn from_dispatch_error(err: &DispatchError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;

    #[test]
    fn test_envelope_shape() {
        let err = DispatchError::Command(CommandError::ConflictingFlags);
        let value = serde_json::to_value(ErrorOutput::from_dispatch_error(&err)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "ok": false,
                "error": {
                    "code": "conflicting_flags",
                    "message": "Cannot specify both enabled and disabled."
                }
            })
        );
    }
}
