/// Prerequisites a command checks before doing any remote work.
use std::rc::Rc;

use thiserror::Error;

use crate::config::ConfigLoader;

/// A failed prerequisite.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementError {
    /// No platform endpoint configured.
    #[error("No API endpoint set. Use '{bin} --api URL' or set BPCTL_API.")]
    NoApiEndpoint {
        /// Binary name for the hint.
        bin: &'static str,
    },

    /// No access token configured.
    #[error("Not logged in. Set BPCTL_ACCESS_TOKEN or AccessToken in the config file.")]
    NotLoggedIn,

    /// The config file exists but cannot be used.
    #[error("{message}")]
    ConfigUnavailable {
        /// The rendered `ConfigError`.
        message: String,
    },
}

/// A single prerequisite check.
pub trait Requirement {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Pass or fail.
    ///
    /// # Errors
    ///
    /// Returns `RequirementError` when the prerequisite is not met.
    fn execute(&self) -> Result<(), RequirementError>;
}

/// Builds the prerequisites commands may ask for.
pub trait RequirementsFactory {
    /// The "is logged in" check.
    fn new_login_requirement(&self) -> Box<dyn Requirement>;
}

/// Requires an API endpoint and an access token in the loaded config.
pub struct LoginRequirement {
    config: Rc<ConfigLoader>,
}

impl LoginRequirement {
    #[must_use]
    pub fn new(config: Rc<ConfigLoader>) -> Self {
        Self { config }
    }
}

impl Requirement for LoginRequirement {
    fn name(&self) -> &'static str {
        "is-logged-in"
    }

    fn execute(&self) -> Result<(), RequirementError> {
        let config = self
            .config
            .get()
            .map_err(|err| RequirementError::ConfigUnavailable {
                message: err.to_string(),
            })?;
        if config.api_endpoint().is_none() {
            return Err(RequirementError::NoApiEndpoint {
                bin: crate::BIN_NAME,
            });
        }
        if config.token().is_none() {
            return Err(RequirementError::NotLoggedIn);
        }
        Ok(())
    }
}

/// Factory backed by the process configuration.
pub struct ConfigRequirementsFactory {
    config: Rc<ConfigLoader>,
}

impl ConfigRequirementsFactory {
    #[must_use]
    pub fn new(config: Rc<ConfigLoader>) -> Self {
        Self { config }
    }
}

impl RequirementsFactory for ConfigRequirementsFactory {
    fn new_login_requirement(&self) -> Box<dyn Requirement> {
        Box::new(LoginRequirement::new(Rc::clone(&self.config)))
    }
}

/// Run `requirements` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first `RequirementError` encountered.
pub fn run_all(requirements: &[Box<dyn Requirement + '_>]) -> Result<(), RequirementError> {
    for requirement in requirements {
        tracing::debug!(requirement = requirement.name(), "checking requirement");
        requirement.execute()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::*;
    use crate::config::ACCESS_TOKEN_ENV;

    /// A loader over a config file that does not exist, with overrides applied.
    fn config(target: Option<&str>, token: Option<&str>) -> Rc<ConfigLoader> {
        let token = token.map(str::to_owned);
        Rc::new(ConfigLoader::new(
            PathBuf::from("/definitely/not/here/config.json"),
            target.map(str::to_owned),
            move |key| (key == ACCESS_TOKEN_ENV).then(|| token.clone()).flatten(),
        ))
    }

    #[test]
    fn test_login_passes_with_endpoint_and_token() {
        let factory = ConfigRequirementsFactory::new(config(Some("https://api"), Some("tok")));
        assert_eq!(factory.new_login_requirement().execute(), Ok(()));
    }

    #[test]
    fn test_login_requires_endpoint_first() {
        let req = LoginRequirement::new(config(None, None));
        assert!(matches!(
            req.execute(),
            Err(RequirementError::NoApiEndpoint { .. })
        ));
    }

    #[test]
    fn test_login_requires_token() {
        let req = LoginRequirement::new(config(Some("https://api"), None));
        assert_eq!(req.execute(), Err(RequirementError::NotLoggedIn));
    }

    #[test]
    fn test_login_reports_broken_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{oops").unwrap();
        let req = LoginRequirement::new(Rc::new(ConfigLoader::new(path, None, |_| None)));

        match req.execute() {
            Err(RequirementError::ConfigUnavailable { message }) => {
                assert!(message.contains("is not valid JSON"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    struct Counting<'a> {
        calls: &'a Cell<u32>,
        pass: bool,
    }

    impl Requirement for Counting<'_> {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn execute(&self) -> Result<(), RequirementError> {
            self.calls.set(self.calls.get() + 1);
            if self.pass {
                Ok(())
            } else {
                Err(RequirementError::NotLoggedIn)
            }
        }
    }

    #[test]
    fn test_run_all_stops_at_first_failure() {
        let calls = Cell::new(0);
        let reqs: Vec<Box<dyn Requirement + '_>> = vec![
            Box::new(Counting { calls: &calls, pass: true }),
            Box::new(Counting { calls: &calls, pass: false }),
            Box::new(Counting { calls: &calls, pass: true }),
        ];
        assert_eq!(run_all(&reqs), Err(RequirementError::NotLoggedIn));
        assert_eq!(calls.get(), 2);
    }
}
