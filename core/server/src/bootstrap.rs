//! Provider set built from the configuration.

use std::sync::Arc;

use muxd_auth::{JsonAuthProvider, TokenSigner};
use muxd_common::Result;
use muxd_config::Config;
use muxd_mux::{ApiMux, AuthMux, StorageMux};
use muxd_storage::LocalProvider;

use crate::apis::{AuthApi, FilesApi};

/// Auth scheme id of the credentials-file provider.
pub const JSON_AUTH_ID: &str = "json";
/// Storage id of the filesystem provider.
pub const LOCAL_STORAGE_ID: &str = "local";

const EMPTY_CREDENTIALS: &str = r#"{"users":{}}"#;

/// The providers the daemon runs with.
///
/// Each builder returns a new multiplexer holding new provider instances;
/// two calls never share state.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    config: Arc<Config>,
}

impl ProviderSet {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Signer for the configured token settings.
    ///
    /// # Errors
    /// - `Config` for an unsupported cipher suite or an unusable secret
    pub fn token_signer(&self) -> Result<TokenSigner> {
        TokenSigner::new(
            &self.config.token_secret,
            &self.config.token_cipher_suite,
            self.config.token_ttl_secs,
        )
    }

    /// Auth schemes: the `json` credentials file.
    ///
    /// A missing credentials file yields a scheme with no users.
    pub async fn auth_mux(&self) -> Result<AuthMux> {
        let path = &self.config.credentials_file;
        let provider = if tokio::fs::try_exists(path).await? {
            JsonAuthProvider::open(JSON_AUTH_ID, path).await?
        } else {
            tracing::warn!(path = %path.display(), "credentials file missing, no user can log in");
            JsonAuthProvider::from_json(JSON_AUTH_ID, EMPTY_CREDENTIALS)?
        };

        let mut mux = AuthMux::new();
        mux.register_auth_provider(Arc::new(provider))?;
        Ok(mux)
    }

    /// Storage backends: the `local` directory tree.
    pub fn storage_mux(&self) -> Result<StorageMux> {
        let local = LocalProvider::new(LOCAL_STORAGE_ID, &self.config.storage_root)?;
        tracing::debug!(id = LOCAL_STORAGE_ID, root = %local.root().display(), "storage provider ready");

        let mut mux = StorageMux::new();
        mux.register_storage_provider(Arc::new(local))?;
        Ok(mux)
    }

    /// APIs: `auth` and `files`.
    pub fn api_mux(&self) -> Result<ApiMux> {
        let mut mux = ApiMux::new();
        mux.register_api(Arc::new(AuthApi::new()?))?;
        mux.register_api(Arc::new(FilesApi::new()?))?;
        Ok(mux)
    }
}
