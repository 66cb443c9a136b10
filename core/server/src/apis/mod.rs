//! APIs served by the daemon.

pub mod auth;
pub mod files;

pub use auth::AuthApi;
pub use files::FilesApi;

use http::header::AUTHORIZATION;

use muxd_auth::{bearer_token, Identity, TokenSigner};
use muxd_common::{Error, Result};
use muxd_mux::{ApiRequest, RequestContext};

/// Token signer for the configured secret and suite.
pub(crate) fn signer(ctx: &RequestContext) -> Result<TokenSigner> {
    let config = ctx.config();
    TokenSigner::new(
        &config.token_secret,
        &config.token_cipher_suite,
        config.token_ttl_secs,
    )
}

/// Identity carried by the request's bearer token.
pub(crate) fn authorize(ctx: &RequestContext, request: &ApiRequest) -> Result<Identity> {
    let token = request
        .header(AUTHORIZATION.as_str())
        .and_then(bearer_token)
        .ok_or_else(|| Error::Auth("Missing bearer token".to_string()))?;
    signer(ctx)?.verify(token)
}
