//! Common utilities and types shared across muxd crates.
//!
//! This module provides the error taxonomy and the identifier types that
//! every multiplexer and provider speaks.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ProviderId, RequestId, ResourcePath, SecretString};
