//! Request dispatcher.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method, Response};
use tracing::Instrument;

use crate::bootstrap::ProviderSet;
use muxd_common::{Error, RequestId, Result};
use muxd_config::Config;
use muxd_mux::{ApiMux, ApiRequest, AuthMux, RequestContext, ResponseSink, StorageMux};

/// Log target of the access log.
pub const ACCESS_LOG_TARGET: &str = "muxd::access";

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Entry point of every request.
///
/// Holds the configuration snapshot and the three multiplexers, all built
/// once at startup and shared read-only by every request.
#[derive(Debug)]
pub struct Dispatcher {
    config: Arc<Config>,
    auth: Arc<AuthMux>,
    storage: Arc<StorageMux>,
    apis: Arc<ApiMux>,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, auth: AuthMux, storage: StorageMux, apis: ApiMux) -> Self {
        Self {
            config,
            auth: Arc::new(auth),
            storage: Arc::new(storage),
            apis: Arc::new(apis),
        }
    }

    /// Build every multiplexer from the provider set.
    ///
    /// # Errors
    /// - `Config` if the token settings are unusable
    /// - `Internal` if a provider cannot be created or registered
    pub async fn bootstrap(providers: &ProviderSet) -> Result<Self> {
        providers.token_signer().map_err(|e| {
            tracing::error!(error = %e, "token settings rejected");
            e
        })?;
        let auth = providers.auth_mux().await.map_err(|e| startup_failure("auth", e))?;
        let storage = providers.storage_mux().map_err(|e| startup_failure("storage", e))?;
        let apis = providers.api_mux().map_err(|e| startup_failure("api", e))?;

        tracing::info!(
            schemes = auth.schemes().count(),
            storages = storage.storages().count(),
            apis = apis.apis().count(),
            "providers registered"
        );
        Ok(Self::new(providers.config().clone(), auth, storage, apis))
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Serve one request.
    ///
    /// Never fails: errors become error responses. The response carries the
    /// request id in `x-request-id`.
    pub async fn dispatch(&self, request: ApiRequest) -> Response<Bytes> {
        let started = Instant::now();
        let ctx = self.context();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut sink = ResponseSink::new();
        async {
            tracing::debug!(method = %method, path = %path, "request started");
            self.apis.handle_request(&ctx, &mut sink, request).await;
        }
        .instrument(ctx.span().clone())
        .await;

        self.finish(started, &ctx, &method, &path, sink)
    }

    /// Answer a request that failed before it could be dispatched, such as
    /// one whose body could not be read.
    ///
    /// The response gets a request id and an access log line like any
    /// dispatched request.
    pub fn reject(&self, method: &Method, path: &str, err: &Error) -> Response<Bytes> {
        let started = Instant::now();
        let ctx = self.context();

        let mut sink = ResponseSink::new();
        ctx.span().in_scope(|| {
            tracing::warn!(method = %method, path, error = %err, "request rejected");
        });
        sink.fail(err, ctx.request_id());

        self.finish(started, &ctx, method, path, sink)
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(
            RequestId::generate(),
            self.config.clone(),
            self.auth.clone(),
            self.storage.clone(),
        )
    }

    fn finish(
        &self,
        started: Instant,
        ctx: &RequestContext,
        method: &Method,
        path: &str,
        mut sink: ResponseSink,
    ) -> Response<Bytes> {
        let request_id = ctx.request_id();
        let status = sink.status().as_u16();
        let bytes = sink.body().len();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        ctx.span().in_scope(|| {
            tracing::debug!(status, bytes, elapsed_ms, "request finished");
        });
        tracing::info!(
            target: ACCESS_LOG_TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            bytes,
            elapsed_ms,
            "\"{} {}\" {} {}",
            method,
            path,
            status,
            bytes
        );

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            sink.insert_header(REQUEST_ID_HEADER, value);
        }
        sink.into_response()
    }
}

fn startup_failure(stage: &str, err: Error) -> Error {
    tracing::error!(stage, error = %err, "provider registration failed");
    Error::Internal(format!("Cannot build {} providers: {}", stage, err))
}
