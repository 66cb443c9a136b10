//! Configuration snapshot for muxd.
//!
//! Provides:
//! - The read-only [`Config`] snapshot and its JSON persistence
//! - Token secret generation
//! - The interactive wizard behind `--createconfig`

pub mod config;
pub mod secret;
pub mod wizard;

pub use config::{
    Config, LogFormat, LogLevel, DEFAULT_CONFIG_NAME, DEFAULT_PORT, DEFAULT_TOKEN_CIPHER_SUITE,
};
pub use secret::{generate_token_secret, TOKEN_SECRET_LEN};
pub use wizard::{run_wizard, WizardOutcome};
