//! HTTP routes and listener.
//!
//! Every method on every path goes to the dispatcher through a single
//! fallback handler; routing happens in the API multiplexer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use http_body_util::LengthLimitError;

use crate::dispatcher::Dispatcher;
use muxd_common::{Error, Result};
use muxd_mux::ApiRequest;

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
struct RouterState {
    dispatcher: Arc<Dispatcher>,
    body_limit: usize,
}

/// Build the router that hands every request to `dispatcher`.
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    create_router_with_body_limit(dispatcher, MAX_BODY_BYTES)
}

/// Like [`create_router`], rejecting bodies over `body_limit` bytes with 413.
pub fn create_router_with_body_limit(dispatcher: Arc<Dispatcher>, body_limit: usize) -> Router {
    Router::new().fallback(dispatch).with_state(RouterState {
        dispatcher,
        body_limit,
    })
}

async fn dispatch(State(state): State<RouterState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(body) => body,
        Err(err) => {
            let err = body_error(&err, state.body_limit);
            return state
                .dispatcher
                .reject(&parts.method, parts.uri.path(), &err)
                .map(Body::from);
        }
    };

    let request = ApiRequest::from_http(http::Request::from_parts(parts, body));
    state.dispatcher.dispatch(request).await.map(Body::from)
}

fn body_error(err: &axum::Error, limit: usize) -> Error {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return Error::PayloadTooLarge(format!("Request body exceeds {} bytes", limit));
        }
        source = cause.source();
    }
    Error::InvalidInput(format!("Cannot read request body: {}", err))
}

/// Listen on `port` until Ctrl-C.
///
/// # Errors
/// - The port cannot be bound
/// - The server fails while running
pub async fn serve(dispatcher: Arc<Dispatcher>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, create_router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
