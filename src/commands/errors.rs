/// Errors from command execution.
use thiserror::Error;

use crate::api::ApiError;
use crate::registry::UsageError;
use crate::requirements::RequirementError;

/// Exit code for failed commands.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for argument-contract violations.
pub const EXIT_USAGE: i32 = 2;
/// Exit code when the config file cannot be read or parsed.
pub const EXIT_CONFIG: i32 = 3;

/// A command ran and failed.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The position argument is not an integer.
    #[error(
        "Error {value} is being passed in as the argument for 'Position' but 'Position' requires an integer.  For more syntax help, see `{bin} create-buildpack -h`.",
        bin = crate::BIN_NAME
    )]
    InvalidPosition {
        /// The literal the user passed.
        value: String,
    },

    /// Both `--enable` and `--disable` were given.
    #[error("Cannot specify both enabled and disabled.")]
    ConflictingFlags,

    /// `execute` was reached with the wrong number of arguments.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A prerequisite was not met.
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// The platform call failed. Carried as-is.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CommandError {
    /// Machine-readable code for the JSON error envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPosition { .. } => "invalid_position",
            Self::ConflictingFlags => "conflicting_flags",
            Self::Requirement(RequirementError::NoApiEndpoint { .. }) => "no_api_endpoint",
            Self::Usage(_) => "incorrect_usage",
            Self::Requirement(RequirementError::NotLoggedIn) => "not_logged_in",
            Self::Requirement(RequirementError::ConfigUnavailable { .. }) => "config_error",
            Self::Api(api) => api.kind(),
        }
    }
}

/// Anything that stops a dispatched command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Argument contract violated; the process exits with the usage text.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// No command registered under this name.
    #[error("'{name}' is not a registered command.")]
    UnknownCommand {
        /// The requested name.
        name: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl DispatchError {
    /// Return the CLI exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_)
            | Self::UnknownCommand { .. }
            | Self::Command(CommandError::Usage(_)) => EXIT_USAGE,
            Self::Command(CommandError::Requirement(RequirementError::ConfigUnavailable {
                ..
            })) => EXIT_CONFIG,
            Self::Command(_) => EXIT_FAILURE,
        }
    }

    /// Machine-readable code for the JSON error envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "incorrect_usage",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::Command(err) => err.code(),
        }
    }
}
