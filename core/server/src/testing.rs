//! Test fixtures shared by the server tests.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::apis::{AuthApi, FilesApi};
use crate::dispatcher::Dispatcher;
use muxd_auth::{hash_password, JsonAuthProvider};
use muxd_config::Config;
use muxd_mux::{ApiMux, ApiRequest, AuthMux, StorageMux};
use muxd_storage::MemoryProvider;

/// Dispatcher with user `alice` / `wonderland` and the memory mounts
/// `mem` and `scratch`.
pub(crate) async fn dispatcher() -> Dispatcher {
    let users = serde_json::json!({
        "users": {
            "alice": {
                "password_hash": hash_password("wonderland").unwrap(),
                "display_name": "Alice",
            }
        }
    });
    let mut auth = AuthMux::new();
    auth.register_auth_provider(Arc::new(
        JsonAuthProvider::from_json("json", &users.to_string()).unwrap(),
    ))
    .unwrap();

    let mut storage = StorageMux::new();
    for id in ["mem", "scratch"] {
        storage
            .register_storage_provider(Arc::new(MemoryProvider::new(id).unwrap()))
            .unwrap();
    }

    let mut apis = ApiMux::new();
    apis.register_api(Arc::new(AuthApi::new().unwrap())).unwrap();
    apis.register_api(Arc::new(FilesApi::new().unwrap())).unwrap();

    Dispatcher::new(Arc::new(Config::generate(8080)), auth, storage, apis)
}

fn headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
    }
    headers
}

pub(crate) fn request(method: Method, path: &str, body: Bytes, token: Option<&str>) -> ApiRequest {
    ApiRequest::new(method, path.parse().unwrap(), headers(token), body)
}

pub(crate) fn get(path: &str, token: Option<&str>) -> ApiRequest {
    request(Method::GET, path, Bytes::new(), token)
}

pub(crate) fn post_json(path: &str, body: &str, token: Option<&str>) -> ApiRequest {
    let mut headers = headers(token);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    ApiRequest::new(
        Method::POST,
        path.parse().unwrap(),
        headers,
        Bytes::from(body.to_string()),
    )
}

/// Log in as alice and return the bearer token.
pub(crate) async fn login(dispatcher: &Dispatcher) -> String {
    let response = dispatcher
        .dispatch(post_json(
            "/api/auth/login",
            r#"{"username":"alice","password":"wonderland"}"#,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    body["token"].as_str().unwrap().to_string()
}
