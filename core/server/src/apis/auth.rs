//! `auth` API: token login and identity lookup.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::{authorize, signer};
use muxd_auth::{Credentials, Identity, IssuedToken};
use muxd_common::{ProviderId, Result, SecretString};
use muxd_mux::{ApiProvider, ApiRequest, Operation, RequestContext, ResourceRule, ResponseSink};

/// Scheme used when a login request names none.
pub const DEFAULT_SCHEME: &str = "json";

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    scheme: Option<String>,
    username: String,
    password: SecretString,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    #[serde(flatten)]
    token: IssuedToken,
    identity: Identity,
}

struct Login;

#[async_trait]
impl Operation for Login {
    fn name(&self) -> &str {
        "login"
    }

    fn method(&self) -> Method {
        Method::POST
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::None
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let body: LoginRequest = request.json()?;
        let scheme = body.scheme.as_deref().unwrap_or(DEFAULT_SCHEME);
        let credentials = Credentials {
            username: body.username,
            password: body.password,
        };

        let identity = ctx.auth().authenticate(scheme, &credentials).await?;
        let token = signer(ctx)?.issue(&identity)?;
        tracing::info!(scheme, user = %identity.username, "login succeeded");

        sink.json(StatusCode::OK, &LoginResponse { token, identity })
    }
}

struct WhoAmI;

#[async_trait]
impl Operation for WhoAmI {
    fn name(&self) -> &str {
        "whoami"
    }

    fn method(&self) -> Method {
        Method::GET
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::None
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let identity = authorize(ctx, request)?;
        sink.json(StatusCode::OK, &identity)
    }
}

/// Login with any registered auth scheme and inspect the resulting token.
pub struct AuthApi {
    name: ProviderId,
    operations: Vec<Arc<dyn Operation>>,
}

impl AuthApi {
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: ProviderId::new("auth")?,
            operations: vec![Arc::new(Login), Arc::new(WhoAmI)],
        })
    }
}

impl ApiProvider for AuthApi {
    fn name(&self) -> &ProviderId {
        &self.name
    }

    fn operations(&self) -> &[Arc<dyn Operation>] {
        &self.operations
    }
}
