//! JSON credentials-file authentication provider.
//!
//! The file maps usernames to argon2 PHC password hashes:
//!
//! ```json
//! { "users": { "alice": { "password_hash": "$argon2id$...", "display_name": "Alice" } } }
//! ```

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use rand::RngCore;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::provider::{AuthProvider, Credentials, Identity};
use muxd_common::{Error, ProviderId, Result};

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    users: HashMap<String, UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    password_hash: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Authentication against a JSON file of argon2 password hashes.
///
/// The file is read once when the provider is opened.
pub struct JsonAuthProvider {
    id: ProviderId,
    users: Arc<HashMap<String, UserRecord>>,
}

impl JsonAuthProvider {
    /// Open a credentials file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON or holds a malformed hash
    pub async fn open(id: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "Cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        let provider = Self::from_json(id, &raw)?;
        tracing::debug!(
            provider = %provider.id,
            users = provider.users.len(),
            path = %path.display(),
            "credentials file loaded"
        );
        Ok(provider)
    }

    /// Build a provider from the JSON text of a credentials file.
    pub fn from_json(id: impl Into<String>, json: &str) -> Result<Self> {
        let id = ProviderId::new(id)?;
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid credentials file: {}", e)))?;

        for (username, record) in &file.users {
            PasswordHash::new(&record.password_hash).map_err(|e| {
                Error::Config(format!("Malformed password hash for '{}': {}", username, e))
            })?;
        }

        Ok(Self {
            id,
            users: Arc::new(file.users),
        })
    }
}

/// Hash a password into the PHC string stored in a credentials file.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| Error::Internal(format!("Cannot encode salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Cannot hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[async_trait]
impl AuthProvider for JsonAuthProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        let Some(record) = self.users.get(&credentials.username) else {
            return Err(Error::Auth("Invalid username or password".to_string()));
        };

        let hash = record.password_hash.clone();
        let password = credentials.password.clone();
        // argon2 verification is CPU bound.
        let verified = tokio::task::spawn_blocking(move || -> Result<bool> {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| Error::Internal(format!("Stored hash unreadable: {}", e)))?;
            Ok(Argon2::default()
                .verify_password(password.expose().as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))??;

        if !verified {
            return Err(Error::Auth("Invalid username or password".to_string()));
        }

        Ok(Identity {
            scheme: self.id.to_string(),
            username: credentials.username.clone(),
            display_name: record.display_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hash(password: &str) -> String {
        hash_password(password).unwrap()
    }

    fn users_json() -> String {
        serde_json::json!({
            "users": {
                "alice": { "password_hash": hash("wonderland"), "display_name": "Alice" },
                "bob": { "password_hash": hash("builder") }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let provider = JsonAuthProvider::from_json("json", &users_json()).unwrap();
        let identity = provider
            .authenticate(&Credentials::new("alice", "wonderland"))
            .await
            .unwrap();

        assert_eq!(identity.scheme, "json");
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let provider = JsonAuthProvider::from_json("json", &users_json()).unwrap();
        let result = provider
            .authenticate(&Credentials::new("bob", "wonderland"))
            .await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let provider = JsonAuthProvider::from_json("json", &users_json()).unwrap();
        let result = provider
            .authenticate(&Credentials::new("mallory", "x"))
            .await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash("same"), hash("same"));
    }

    #[test]
    fn test_malformed_hash_rejected_at_load() {
        let json = r#"{"users": {"eve": {"password_hash": "plaintext"}}}"#;
        assert!(matches!(
            JsonAuthProvider::from_json("json", json),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.json");
        tokio::fs::write(&path, users_json()).await.unwrap();

        let provider = JsonAuthProvider::open("json", &path).await.unwrap();
        assert_eq!(provider.id().as_str(), "json");
        assert!(JsonAuthProvider::open("json", temp.path().join("nope.json"))
            .await
            .is_err());
    }
}
