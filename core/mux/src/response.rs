//! Response sink written by operations.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use serde::Serialize;

use muxd_common::{Error, RequestId, Result};

/// HTTP status an error maps to.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::InvalidInput(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) | Error::ProviderNotFound { .. } | Error::Routing(_) => {
            StatusCode::NOT_FOUND
        }
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Config(_)
        | Error::DuplicateProvider { .. }
        | Error::Storage(_)
        | Error::Io(_)
        | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    request_id: String,
}

/// Buffered response an operation fills in.
///
/// Starts as an empty `200 OK`. Converted into an `http::Response` once
/// the operation returns.
#[derive(Debug)]
pub struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append raw bytes to the body.
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the response with a JSON document.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.status = status;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = body;
        Ok(())
    }

    /// Replace the response with raw bytes of the given content type.
    pub fn bytes(&mut self, status: StatusCode, content_type: &'static str, data: Vec<u8>) {
        self.status = status;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = data;
    }

    /// Replace the response with an empty `204 No Content`.
    pub fn no_content(&mut self) {
        self.status = StatusCode::NO_CONTENT;
        self.headers.remove(CONTENT_TYPE);
        self.body.clear();
    }

    /// Discard whatever was written and describe `err` instead.
    ///
    /// Server-side failures (5xx) do not echo the internal message.
    pub fn fail(&mut self, err: &Error, request_id: RequestId) {
        let status = status_for(err);
        let detail = err.to_string();
        let message = if status.is_server_error() {
            status.canonical_reason().unwrap_or("Internal Server Error")
        } else {
            detail.as_str()
        };
        let body = ErrorBody {
            error: err.kind(),
            message,
            request_id: request_id.to_string(),
        };

        self.headers.clear();
        self.body.clear();
        if self.json(status, &body).is_err() {
            self.status = status;
        }
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::Routing("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&Error::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&Error::AlreadyExists("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&Error::PayloadTooLarge("x".into())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_fail_replaces_partial_output() {
        let mut sink = ResponseSink::new();
        sink.write(b"partial");
        sink.fail(&Error::NotFound("/a".into()), RequestId::generate());

        let body: serde_json::Value = serde_json::from_slice(sink.body()).unwrap();
        assert_eq!(sink.status(), StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Not found: /a");
    }

    #[test]
    fn test_fail_hides_internal_detail() {
        let mut sink = ResponseSink::new();
        sink.fail(&Error::Internal("secret stack".into()), RequestId::generate());

        let body: serde_json::Value = serde_json::from_slice(sink.body()).unwrap();
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[test]
    fn test_into_response() {
        let mut sink = ResponseSink::new();
        sink.bytes(StatusCode::CREATED, "text/plain", b"ok".to_vec());

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.body().as_ref(), b"ok");
    }
}
