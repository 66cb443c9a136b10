//! Authentication capability for muxd.
//!
//! Provides the [`AuthProvider`] trait the auth multiplexer selects between,
//! the JSON credentials-file scheme and the bearer token signer used by the
//! `auth` API.

pub mod json;
pub mod provider;
pub mod token;

pub use json::{hash_password, JsonAuthProvider};
pub use provider::{AuthProvider, Credentials, Identity};
pub use token::{bearer_token, IssuedToken, TokenSigner, BLAKE2B_MAC_SUITE, MAX_TOKEN_TTL_SECS};
