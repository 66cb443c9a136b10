//! Per-request context.

use std::fmt;
use std::sync::Arc;
use tracing::Span;

use crate::auth::AuthMux;
use crate::storage::StorageMux;
use muxd_common::RequestId;
use muxd_config::Config;

/// Immutable value carried through one request.
///
/// Holds the request id, the `request` span every log line of the request
/// is emitted in, the configuration snapshot and the multiplexers. All
/// fields are fixed at construction and only exposed through getters, so
/// a context can be shared by any number of concurrent sub-operations
/// without locking. Clones share the same values.
#[derive(Clone)]
pub struct RequestContext {
    request_id: RequestId,
    span: Span,
    config: Arc<Config>,
    auth: Arc<AuthMux>,
    storage: Arc<StorageMux>,
}

impl RequestContext {
    /// Build the context for one request. Pure construction, no I/O.
    pub fn new(
        request_id: RequestId,
        config: Arc<Config>,
        auth: Arc<AuthMux>,
        storage: Arc<StorageMux>,
    ) -> Self {
        let span = tracing::info_span!("request", request_id = %request_id);
        Self {
            request_id,
            span,
            config,
            auth,
            storage,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Span bound to this request's id.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthMux> {
        &self.auth
    }

    pub fn storage(&self) -> &Arc<StorageMux> {
        &self.storage
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(config: &Arc<Config>, auth: &Arc<AuthMux>, storage: &Arc<StorageMux>) -> RequestContext {
        RequestContext::new(
            RequestId::generate(),
            config.clone(),
            auth.clone(),
            storage.clone(),
        )
    }

    #[test]
    fn test_each_context_gets_its_own_id() {
        let config = Arc::new(Config::generate(8080));
        let auth = Arc::new(AuthMux::new());
        let storage = Arc::new(StorageMux::new());

        let first = context(&config, &auth, &storage);
        let second = context(&config, &auth, &storage);

        assert!(!first.request_id().to_string().is_empty());
        assert_ne!(first.request_id(), second.request_id());
    }

    #[test]
    fn test_fields_read_back_identically() {
        let config = Arc::new(Config::generate(8080));
        let auth = Arc::new(AuthMux::new());
        let storage = Arc::new(StorageMux::new());
        let ctx = context(&config, &auth, &storage);

        assert_eq!(ctx.request_id(), ctx.request_id());
        assert!(Arc::ptr_eq(ctx.config(), ctx.config()));
        assert!(Arc::ptr_eq(ctx.config(), &config));
        assert!(Arc::ptr_eq(ctx.auth(), &auth));
        assert!(Arc::ptr_eq(ctx.storage(), &storage));

        let clone = ctx.clone();
        assert_eq!(clone.request_id(), ctx.request_id());
        assert!(Arc::ptr_eq(clone.storage(), ctx.storage()));
    }
}
