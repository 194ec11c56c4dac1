/// Persistent CLI configuration: API endpoint and credentials.
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Directory variable that relocates the config file.
pub const HOME_ENV: &str = "BPCTL_HOME";
/// Access token override.
pub const ACCESS_TOKEN_ENV: &str = "BPCTL_ACCESS_TOKEN";
/// TLS verification override (`true`/`1` to skip).
pub const SKIP_SSL_ENV: &str = "BPCTL_SKIP_SSL_VALIDATION";

const CONFIG_DIR: &str = ".bpctl";
const CONFIG_FILE: &str = "config.json";

/// Errors loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Platform API endpoint, e.g. `https://api.example.com`.
    #[serde(default)]
    pub target: Option<String>,
    /// OAuth access token, with or without the `bearer ` prefix.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Skip TLS certificate verification.
    #[serde(default, rename = "SSLDisabled")]
    pub ssl_disabled: bool,
}

impl Config {
    /// Load the config at `path`. A missing file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Apply overrides from the command line and environment.
    ///
    /// `lookup` reads an environment variable; it is injected so tests do not
    /// touch the process environment.
    #[must_use]
    pub fn with_overrides(mut self, api: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(api) = api.filter(|a| !a.is_empty()) {
            self.target = Some(api.to_owned());
        }
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.access_token = Some(token);
        }
        if let Some(skip) = lookup(SKIP_SSL_ENV) {
            self.ssl_disabled = matches!(skip.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Endpoint, if set and non-blank.
    #[must_use]
    pub fn api_endpoint(&self) -> Option<&str> {
        self.target.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Access token, if set and non-blank.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Environment lookup, injected so tests do not touch the process environment.
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Loads the config on first use and caches the outcome.
///
/// Nothing is read until a requirement or repository asks for it.
pub struct ConfigLoader {
    path: PathBuf,
    api: Option<String>,
    lookup: EnvLookup,
    loaded: OnceCell<Result<Config, ConfigError>>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(
        path: PathBuf,
        api: Option<String>,
        lookup: impl Fn(&str) -> Option<String> + 'static,
    ) -> Self {
        Self {
            path,
            api,
            lookup: Box::new(lookup),
            loaded: OnceCell::new(),
        }
    }

    /// The loaded config with command-line and environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` from the first load attempt.
    pub fn get(&self) -> Result<&Config, &ConfigError> {
        self.loaded
            .get_or_init(|| {
                let config = Config::load(&self.path)?
                    .with_overrides(self.api.as_deref(), |key| (self.lookup)(key));
                debug!(
                    path = %self.path.display(),
                    endpoint = config.api_endpoint().unwrap_or("<unset>"),
                    "loaded config"
                );
                Ok(config)
            })
            .as_ref()
    }
}

/// Resolve the config file location.
///
/// Order: explicit path, `$BPCTL_HOME/config.json`, `$HOME/.bpctl/config.json`,
/// then `.bpctl/config.json` relative to the working directory.
#[must_use]
pub fn config_path(explicit: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_owned();
    }
    if let Some(home) = lookup(HOME_ENV).filter(|h| !h.is_empty()) {
        return PathBuf::from(home).join(CONFIG_FILE);
    }
    lookup("HOME")
        .filter(|h| !h.is_empty())
        .map_or_else(|| PathBuf::from(CONFIG_DIR), |h| PathBuf::from(h).join(CONFIG_DIR))
        .join(CONFIG_FILE)
}
