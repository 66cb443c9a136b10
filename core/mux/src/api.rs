//! API providers, operations and the API multiplexer.
//!
//! Request paths follow `/api/{api}/{operation}/{resource...}`. The API
//! segment selects a registered [`ApiProvider`]; the operation segment and
//! the HTTP method select one of its [`Operation`]s; the remaining segments
//! are the resource the operation acts on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderMap, Method, Request, Uri};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use crate::context::RequestContext;
use crate::registry::Registry;
use crate::response::{status_for, ResponseSink};
use muxd_common::{Error, ProviderId, ResourcePath, Result};

const API_PREFIX: &str = "/api/";

/// Whether an operation takes a resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRule {
    /// The path must end at the operation segment.
    None,
    /// Any resource path, including none.
    Optional,
    /// At least one resource component.
    Required,
}

impl ResourceRule {
    pub fn accepts(&self, resource: &ResourcePath) -> bool {
        match self {
            ResourceRule::None => resource.is_root(),
            ResourceRule::Optional => true,
            ResourceRule::Required => !resource.is_root(),
        }
    }
}

/// One operation exposed by an API.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Selector matched against the operation segment of the path.
    fn name(&self) -> &str;

    /// HTTP method the operation is bound to.
    fn method(&self) -> Method;

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Optional
    }

    /// Does this operation handle the request?
    ///
    /// The default binds on method, selector and resource rule. `HEAD`
    /// is accepted by operations bound to `GET`.
    fn matches(&self, method: &Method, selector: &str, resource: &ResourcePath) -> bool {
        let bound = self.method();
        let method_ok = *method == bound || (*method == Method::HEAD && bound == Method::GET);
        method_ok && selector == self.name() && self.resource_rule().accepts(resource)
    }

    /// Run the operation, writing its result into `sink`.
    ///
    /// An error leaves the response to the multiplexer, which replaces
    /// anything already written with an error body.
    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()>;
}

/// A named group of operations mounted under `/api/{name}/`.
pub trait ApiProvider: Send + Sync {
    fn name(&self) -> &ProviderId;

    /// Operations in match order. The first match wins.
    fn operations(&self) -> &[Arc<dyn Operation>];
}

/// An inbound request as seen by operations.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    resource: ResourcePath,
}

impl ApiRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            resource: ResourcePath::root(),
        }
    }

    pub fn from_http(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Resource path after the operation segment. Set by the multiplexer.
    pub fn resource(&self) -> &ResourcePath {
        &self.resource
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(Error::InvalidInput("Request body is empty".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A parsed `/api/{api}/{operation}/{resource...}` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub api: String,
    pub operation: String,
    pub resource: ResourcePath,
}

impl Route {
    /// Parse a request path.
    ///
    /// # Errors
    /// - `Routing` if the path is outside `/api/` or lacks the API or
    ///   operation segment
    /// - `InvalidInput` if a resource segment is not valid percent-encoded
    ///   UTF-8 or decodes to a forbidden component
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(API_PREFIX)
            .ok_or_else(|| Error::Routing(format!("'{}' is not an API path", path)))?;

        let mut segments = rest.split('/');
        let api = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Routing("Missing API name".to_string()))?;
        let operation = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Routing(format!("Missing operation for API '{}'", api)))?;

        let components = segments
            .filter(|s| !s.is_empty())
            .map(|s| {
                percent_decode_str(s)
                    .decode_utf8()
                    .map(|c| c.into_owned())
                    .map_err(|_| Error::InvalidInput(format!("Bad path segment '{}'", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            api: api.to_string(),
            operation: operation.to_string(),
            resource: ResourcePath::from_components(components)?,
        })
    }
}

/// Routes requests to API operations.
#[derive(Debug)]
pub struct ApiMux {
    registry: Registry<dyn ApiProvider>,
}

impl ApiMux {
    pub fn new() -> Self {
        Self {
            registry: Registry::new("api"),
        }
    }

    /// Register an API under its own name.
    ///
    /// # Errors
    /// - `DuplicateProvider` if the name is taken
    pub fn register_api(&mut self, api: Arc<dyn ApiProvider>) -> Result<()> {
        let name = api.name().clone();
        self.registry.register(name, api)
    }

    /// Registered API names, in no particular order.
    pub fn apis(&self) -> impl Iterator<Item = &ProviderId> + '_ {
        self.registry.list()
    }

    /// Resolve the operation for a request without running it.
    ///
    /// # Errors
    /// - `Routing` for a malformed path, an unknown API or when no operation
    ///   of the API matches
    pub fn route(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(Arc<dyn ApiProvider>, Arc<dyn Operation>, Route)> {
        let route = Route::parse(path)?;
        let api = self.registry.get(&route.api).map_err(|err| match err {
            Error::ProviderNotFound { id, .. } => Error::Routing(format!("Unknown API '{}'", id)),
            other => other,
        })?;

        let operation = api
            .operations()
            .iter()
            .find(|op| op.matches(method, &route.operation, &route.resource))
            .cloned()
            .ok_or_else(|| {
                Error::Routing(format!(
                    "No operation '{}' for {} in API '{}'",
                    route.operation, method, route.api
                ))
            })?;

        Ok((api, operation, route))
    }

    /// Route and execute one request.
    ///
    /// Never fails: routing errors, operation errors and panics raised while
    /// the operation runs are all written to `sink` as error responses.
    pub async fn handle_request(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        mut request: ApiRequest,
    ) {
        let routed = self.route(request.method(), request.uri().path());
        let (operation, route) = match routed {
            Ok((_, operation, route)) => (operation, route),
            Err(err) => {
                tracing::warn!(error = %err, path = %request.uri().path(), "routing failed");
                sink.fail(&err, ctx.request_id());
                return;
            }
        };

        tracing::debug!(
            api = %route.api,
            operation = operation.name(),
            resource = %route.resource,
            "executing operation"
        );
        request.resource = route.resource;

        let outcome = AssertUnwindSafe(operation.execute(ctx, sink, &request))
            .catch_unwind()
            .await;

        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    api = %route.api,
                    operation = operation.name(),
                    panic = %message,
                    "operation panicked"
                );
                Error::Internal(format!("Operation panicked: {}", message))
            }
        };

        if status_for(&err).is_server_error() {
            tracing::error!(error = %err, operation = operation.name(), "operation failed");
        } else {
            tracing::warn!(error = %err, operation = operation.name(), "operation rejected");
        }
        sink.fail(&err, ctx.request_id());
    }
}

impl Default for ApiMux {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
