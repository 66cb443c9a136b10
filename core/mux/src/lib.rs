//! Multiplexing layer for muxd.
//!
//! Three registries sit behind the dispatcher: [`AuthMux`] selects an
//! authentication scheme, [`StorageMux`] selects a storage backend and
//! [`ApiMux`] selects the API operation that serves a request. Each
//! request carries a [`RequestContext`] into the operation it reaches.

pub mod api;
pub mod auth;
pub mod context;
pub mod registry;
pub mod response;
pub mod storage;

pub use api::{ApiMux, ApiProvider, ApiRequest, Operation, ResourceRule, Route};
pub use auth::AuthMux;
pub use context::RequestContext;
pub use registry::Registry;
pub use response::{status_for, ResponseSink};
pub use storage::StorageMux;
