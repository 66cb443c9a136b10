//! Authentication provider trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use muxd_common::{ProviderId, Result, SecretString};

/// Credentials presented to an authentication scheme.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password),
        }
    }
}

/// The principal established by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Scheme that vouched for this identity.
    pub scheme: String,
    /// Account name.
    pub username: String,
    /// Human readable name, if the scheme knows one.
    pub display_name: Option<String>,
}

/// Authentication scheme plugged into the auth multiplexer.
///
/// Implementations own all credential logic; the multiplexer only selects
/// the provider by id and returns its answer unchanged.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Id the provider registers under (e.g., "json").
    fn id(&self) -> &ProviderId;

    /// Verify credentials.
    ///
    /// # Errors
    /// - `Error::Auth` when the credentials are rejected
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity>;
}
