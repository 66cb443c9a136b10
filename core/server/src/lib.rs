//! muxd server: dispatcher, shipped APIs and the HTTP front end.
//!
//! [`ProviderSet`] turns the configuration into multiplexers,
//! [`Dispatcher`] serves requests against them, and [`routes::serve`] puts
//! the dispatcher behind an axum listener.

pub mod apis;
pub mod bootstrap;
pub mod dispatcher;
pub mod routes;

#[cfg(test)]
mod testing;

pub use bootstrap::ProviderSet;
pub use dispatcher::{Dispatcher, ACCESS_LOG_TARGET};
pub use routes::{create_router, create_router_with_body_limit, serve, MAX_BODY_BYTES};
