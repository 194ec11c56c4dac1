/// Errors from the platform API layer.
use thiserror::Error;

/// Platform error code for "a buildpack with this name already exists".
pub const BUILDPACK_NAME_TAKEN: i64 = 290_001;

/// Typed errors returned by the buildpack repositories.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A buildpack with the requested name already exists.
    #[error("{description}")]
    NameTaken {
        /// Server-provided description.
        description: String,
    },

    /// The platform answered with a non-success status.
    #[error("Server error, status code: {status}, error code: {code}, message: {description}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Platform error code, 0 when the body carried none.
        code: i64,
        /// Server-provided description, or the raw body.
        description: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The buildpack artifact cannot be uploaded as given.
    #[error("Invalid buildpack artifact '{path}': {reason}")]
    InvalidArtifact {
        /// The path or URL supplied by the user.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Zipping a directory artifact failed.
    #[error("Could not zip '{path}': {source}")]
    Archive {
        /// The directory supplied by the user.
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// No platform client could be set up from the configuration.
    #[error("Platform connection is not configured: {reason}")]
    NotConfigured {
        /// Why the configuration is unusable.
        reason: String,
    },

    /// Reading the local artifact failed.
    #[error("Could not read '{path}': {source}")]
    Io {
        /// The local path.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Classify a platform error body by its code.
    #[must_use]
    pub fn from_platform(status: u16, code: i64, description: String) -> Self {
        if code == BUILDPACK_NAME_TAKEN {
            Self::NameTaken { description }
        } else {
            Self::Http {
                status,
                code,
                description,
            }
        }
    }

    /// Machine-readable code for the JSON error envelope.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameTaken { .. } => "name_taken",
            Self::Http { .. } => "http_error",
            Self::Transport(_) => "transport_error",
            Self::InvalidArtifact { .. } => "invalid_artifact",
            Self::Archive { .. } => "archive_error",
            Self::NotConfigured { .. } => "not_configured",
            Self::Io { .. } => "io_error",
        }
    }
}
