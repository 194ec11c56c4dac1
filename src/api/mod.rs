/// Platform API layer: repository contracts and the HTTP implementation.
pub mod errors;
pub mod http;
pub mod models;

use std::cell::OnceCell;
use std::rc::Rc;

use crate::config::ConfigLoader;

pub use errors::ApiError;
pub use http::CloudControllerClient;
pub use models::{Buildpack, OptionIntent};

/// Creates buildpack metadata on the platform.
pub trait BuildpackRepository {
    /// Create a buildpack record without bits.
    ///
    /// `stack` is reserved for stack-scoped buildpacks and is omitted from the
    /// request when `None`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NameTaken` when the name is already in use, or any
    /// other `ApiError` on failure.
    fn create(
        &self,
        name: &str,
        position: Option<i32>,
        intent: OptionIntent,
        stack: Option<&str>,
    ) -> Result<Buildpack, ApiError>;
}

/// Uploads buildpack artifacts.
pub trait BuildpackBitsRepository {
    /// Attach the artifact at `path` (local zip or URL) to `buildpack`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the artifact is unusable or the upload fails.
    fn upload_buildpack(&self, buildpack: &Buildpack, path: &str) -> Result<(), ApiError>;
}

/// Hands out repository collaborators to commands.
#[derive(Clone)]
pub struct RepoLocator {
    buildpacks: Rc<dyn BuildpackRepository>,
    buildpack_bits: Rc<dyn BuildpackBitsRepository>,
}

impl RepoLocator {
    #[must_use]
    pub fn new(
        buildpacks: Rc<dyn BuildpackRepository>,
        buildpack_bits: Rc<dyn BuildpackBitsRepository>,
    ) -> Self {
        Self {
            buildpacks,
            buildpack_bits,
        }
    }

    /// Locator whose repositories share one platform client, built from
    /// `config` on the first remote call.
    #[must_use]
    pub fn connect(config: Rc<ConfigLoader>) -> Self {
        let client = Rc::new(LazyClient {
            config,
            client: OnceCell::new(),
        });
        Self::new(client.clone(), client)
    }

    #[must_use]
    pub fn buildpack_repository(&self) -> Rc<dyn BuildpackRepository> {
        Rc::clone(&self.buildpacks)
    }

    #[must_use]
    pub fn buildpack_bits_repository(&self) -> Rc<dyn BuildpackBitsRepository> {
        Rc::clone(&self.buildpack_bits)
    }
}

/// Defers config loading and client construction until a repository is used.
struct LazyClient {
    config: Rc<ConfigLoader>,
    client: OnceCell<CloudControllerClient>,
}

impl LazyClient {
    fn client(&self) -> Result<&CloudControllerClient, ApiError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let config = self.config.get().map_err(|err| ApiError::NotConfigured {
            reason: err.to_string(),
        })?;
        // Missing endpoint or token is reported by the login requirement.
        let client = CloudControllerClient::new(
            config.api_endpoint().unwrap_or_default(),
            config.token().unwrap_or_default(),
            config.ssl_disabled,
        )?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl BuildpackRepository for LazyClient {
    fn create(
        &self,
        name: &str,
        position: Option<i32>,
        intent: OptionIntent,
        stack: Option<&str>,
    ) -> Result<Buildpack, ApiError> {
        self.client()?.create(name, position, intent, stack)
    }
}

impl BuildpackBitsRepository for LazyClient {
    fn upload_buildpack(&self, buildpack: &Buildpack, path: &str) -> Result<(), ApiError> {
        self.client()?.upload_buildpack(buildpack, path)
    }
}
