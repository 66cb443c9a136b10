//! Signed bearer tokens.
//!
//! A token is `base64url(claims) "." base64url(tag)` where the tag is a
//! keyed BLAKE2b-512 MAC over the encoded claims. The MAC key is the
//! BLAKE2b-512 digest of the configured secret, so secrets of any length
//! are accepted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use blake2::digest::{KeyInit, Mac};
use blake2::{Blake2b512, Blake2bMac512, Digest};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::provider::Identity;
use muxd_common::{Error, Result, SecretString};

/// Cipher suite identifier understood by [`TokenSigner`].
pub const BLAKE2B_MAC_SUITE: &str = "blake2b-512-mac";

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    iat: i64,
    exp: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens for authenticated identities.
pub struct TokenSigner {
    key: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl TokenSigner {
    /// Create a signer.
    ///
    /// # Errors
    /// - Unknown cipher suite
    /// - Empty secret
    /// - Lifetime of zero or above [`MAX_TOKEN_TTL_SECS`]
    pub fn new(secret: &SecretString, cipher_suite: &str, ttl_secs: u64) -> Result<Self> {
        if cipher_suite != BLAKE2B_MAC_SUITE {
            return Err(Error::Config(format!(
                "Unsupported token cipher suite '{}', expected '{}'",
                cipher_suite, BLAKE2B_MAC_SUITE
            )));
        }
        if secret.is_empty() {
            return Err(Error::Config("Token secret must not be empty".to_string()));
        }
        let ttl = Some(ttl_secs)
            .filter(|s| (1..=MAX_TOKEN_TTL_SECS).contains(s))
            .and_then(|s| i64::try_from(s).ok())
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Invalid token lifetime {}s, expected 1..={}",
                    ttl_secs, MAX_TOKEN_TTL_SECS
                ))
            })?;

        Ok(Self {
            key: Zeroizing::new(Blake2b512::digest(secret.expose().as_bytes()).to_vec()),
            ttl,
        })
    }

    /// Issue a token valid from now.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token valid from `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Internal("Token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: identity.username.clone(),
            scheme: identity.scheme.clone(),
            name: identity.display_name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let tag = URL_SAFE_NO_PAD.encode(self.mac(payload.as_bytes())?.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{}.{}", payload, tag),
            expires_at,
        })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token's signature and expiry at `now`.
    ///
    /// # Errors
    /// - `Error::Auth` for malformed, forged or expired tokens
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity> {
        let (payload, tag) = token
            .split_once('.')
            .ok_or_else(|| Error::Auth("Malformed token".to_string()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| Error::Auth("Malformed token".to_string()))?;

        self.mac(payload.as_bytes())?
            .verify_slice(&tag)
            .map_err(|_| Error::Auth("Invalid token signature".to_string()))?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or_else(|| Error::Auth("Malformed token claims".to_string()))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| Error::Auth("Malformed token claims".to_string()))?;
        if now >= expires_at {
            return Err(Error::Auth("Token expired".to_string()));
        }

        Ok(Identity {
            scheme: claims.scheme,
            username: claims.sub,
            display_name: claims.name,
        })
    }

    fn mac(&self, data: &[u8]) -> Result<Blake2bMac512> {
        let mut mac = <Blake2bMac512 as KeyInit>::new_from_slice(&self.key)
            .map_err(|e| Error::Internal(format!("Invalid MAC key: {}", e)))?;
        Mac::update(&mut mac, data);
        Ok(mac)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::new("s3cr3t"), BLAKE2B_MAC_SUITE, 60).unwrap()
    }

    fn alice() -> Identity {
        Identity {
            scheme: "json".to_string(),
            username: "alice".to_string(),
            display_name: Some("Alice".to_string()),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let issued = signer.issue(&alice()).unwrap();
        assert_eq!(signer.verify(&issued.token).unwrap(), alice());
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued_at = Utc::now() - Duration::seconds(120);
        let issued = signer.issue_at(&alice(), issued_at).unwrap();
        assert!(matches!(signer.verify(&issued.token), Err(Error::Auth(_))));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = signer();
        let issued = signer.issue(&alice()).unwrap();
        let (_, tag) = issued.token.split_once('.').unwrap();
        let forged_claims = serde_json::json!({
            "sub": "root", "scheme": "json", "iat": 0, "exp": i64::MAX / 2
        });
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(forged_claims.to_string()),
            tag
        );
        assert!(matches!(signer.verify(&forged), Err(Error::Auth(_))));
    }

    #[test]
    fn test_other_secret_rejected() {
        let issued = signer().issue(&alice()).unwrap();
        let other = TokenSigner::new(&SecretString::new("other"), BLAKE2B_MAC_SUITE, 60).unwrap();
        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_unknown_suite_is_config_error() {
        let result = TokenSigner::new(&SecretString::new("x"), "HS256", 60);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_lifetime_bounds() {
        let secret = SecretString::new("x");
        for ttl in [0, MAX_TOKEN_TTL_SECS + 1, 10_000_000_000_000, u64::MAX] {
            assert!(matches!(
                TokenSigner::new(&secret, BLAKE2B_MAC_SUITE, ttl),
                Err(Error::Config(_))
            ));
        }

        let longest = TokenSigner::new(&secret, BLAKE2B_MAC_SUITE, MAX_TOKEN_TTL_SECS).unwrap();
        let issued = longest.issue(&alice()).unwrap();
        assert_eq!(longest.verify(&issued.token).unwrap(), alice());
    }

    #[test]
    fn test_issue_near_end_of_time_is_an_error() {
        let signer = signer();
        let result = signer.issue_at(&alice(), DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
