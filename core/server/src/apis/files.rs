//! `files` API: storage access across every registered backend.
//!
//! The first resource component names the storage mount; the rest is the
//! path inside that storage. Every operation requires a bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::Serialize;

use super::authorize;
use muxd_common::{ProviderId, ResourcePath, Result};
use muxd_mux::{ApiProvider, ApiRequest, Operation, RequestContext, ResourceRule, ResponseSink};
use muxd_storage::Metadata;

#[derive(Debug, Serialize)]
struct MountListing {
    mounts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DirectoryListing {
    mount: String,
    path: String,
    entries: Vec<Metadata>,
}

/// Authorize the caller and split the resource at its mount point.
fn target(ctx: &RequestContext, request: &ApiRequest) -> Result<(String, ResourcePath)> {
    let identity = authorize(ctx, request)?;
    let (mount, inner) = ctx.storage().resolve_mount(request.resource())?;
    tracing::debug!(user = %identity.username, mount = %mount, path = %inner, "files access");
    Ok((mount, inner))
}

struct List;

#[async_trait]
impl Operation for List {
    fn name(&self) -> &str {
        "list"
    }

    fn method(&self) -> Method {
        Method::GET
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        if request.resource().is_root() {
            authorize(ctx, request)?;
            let mut mounts: Vec<String> = ctx.storage().storages().map(|id| id.to_string()).collect();
            mounts.sort_unstable();
            return sink.json(StatusCode::OK, &MountListing { mounts });
        }

        let (mount, path) = target(ctx, request)?;
        let entries = ctx.storage().list(&mount, &path).await?;
        sink.json(
            StatusCode::OK,
            &DirectoryListing {
                mount,
                path: path.to_string_path(),
                entries,
            },
        )
    }
}

struct Stat;

#[async_trait]
impl Operation for Stat {
    fn name(&self) -> &str {
        "stat"
    }

    fn method(&self) -> Method {
        Method::GET
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Required
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let (mount, path) = target(ctx, request)?;
        let metadata = ctx.storage().stat(&mount, &path).await?;
        sink.json(StatusCode::OK, &metadata)
    }
}

struct Download;

#[async_trait]
impl Operation for Download {
    fn name(&self) -> &str {
        "download"
    }

    fn method(&self) -> Method {
        Method::GET
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Required
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let (mount, path) = target(ctx, request)?;
        let data = ctx.storage().read(&mount, &path).await?;
        sink.bytes(StatusCode::OK, "application/octet-stream", data);
        Ok(())
    }
}

struct Upload;

#[async_trait]
impl Operation for Upload {
    fn name(&self) -> &str {
        "upload"
    }

    fn method(&self) -> Method {
        Method::PUT
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Required
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let (mount, path) = target(ctx, request)?;
        let metadata = ctx
            .storage()
            .write(&mount, &path, request.body().to_vec())
            .await?;
        tracing::info!(mount = %mount, path = %path, size = ?metadata.size, "file uploaded");
        sink.json(StatusCode::CREATED, &metadata)
    }
}

struct Mkdir;

#[async_trait]
impl Operation for Mkdir {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn method(&self) -> Method {
        Method::POST
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Required
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let (mount, path) = target(ctx, request)?;
        let metadata = ctx.storage().create_dir(&mount, &path).await?;
        sink.json(StatusCode::CREATED, &metadata)
    }
}

struct Delete;

#[async_trait]
impl Operation for Delete {
    fn name(&self) -> &str {
        "delete"
    }

    fn method(&self) -> Method {
        Method::DELETE
    }

    fn resource_rule(&self) -> ResourceRule {
        ResourceRule::Required
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: &ApiRequest,
    ) -> Result<()> {
        let (mount, path) = target(ctx, request)?;
        ctx.storage().delete(&mount, &path).await?;
        tracing::info!(mount = %mount, path = %path, "deleted");
        sink.no_content();
        Ok(())
    }
}

/// File operations over the storage multiplexer.
pub struct FilesApi {
    name: ProviderId,
    operations: Vec<Arc<dyn Operation>>,
}

impl FilesApi {
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: ProviderId::new("files")?,
            operations: vec![
                Arc::new(List),
                Arc::new(Stat),
                Arc::new(Download),
                Arc::new(Upload),
                Arc::new(Mkdir),
                Arc::new(Delete),
            ],
        })
    }
}

impl ApiProvider for FilesApi {
    fn name(&self) -> &ProviderId {
        &self.name
    }

    fn operations(&self) -> &[Arc<dyn Operation>] {
        &self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dispatcher, get, login, request};
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;

    #[tokio::test]
    async fn test_requires_token() {
        let dispatcher = dispatcher().await;

        let response = dispatcher.dispatch(get("/api/files/list", None)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_root_lists_mounts() {
        let dispatcher = dispatcher().await;
        let token = login(&dispatcher).await;

        let response = dispatcher
            .dispatch(get("/api/files/list", Some(&token)))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["mounts"], serde_json::json!(["mem", "scratch"]));
    }

    #[tokio::test]
    async fn test_upload_download_stat_delete() {
        let dispatcher = dispatcher().await;
        let token = login(&dispatcher).await;

        let created = dispatcher
            .dispatch(request(
                Method::POST,
                "/api/files/mkdir/mem/docs",
                Bytes::new(),
                Some(&token),
            ))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let uploaded = dispatcher
            .dispatch(request(
                Method::PUT,
                "/api/files/upload/mem/docs/hello%20world.txt",
                Bytes::from_static(b"hello"),
                Some(&token),
            ))
            .await;
        assert_eq!(uploaded.status(), StatusCode::CREATED);
        let metadata: Metadata = serde_json::from_slice(uploaded.body()).unwrap();
        assert_eq!(metadata.name, "hello world.txt");
        assert_eq!(metadata.size, Some(5));

        let downloaded = dispatcher
            .dispatch(get(
                "/api/files/download/mem/docs/hello%20world.txt",
                Some(&token),
            ))
            .await;
        assert_eq!(downloaded.status(), StatusCode::OK);
        assert_eq!(
            downloaded.headers()[CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(downloaded.body().as_ref(), b"hello");

        let listed = dispatcher
            .dispatch(get("/api/files/list/mem/docs", Some(&token)))
            .await;
        let body: serde_json::Value = serde_json::from_slice(listed.body()).unwrap();
        assert_eq!(body["mount"], "mem");
        assert_eq!(body["entries"][0]["name"], "hello world.txt");

        let deleted = dispatcher
            .dispatch(request(
                Method::DELETE,
                "/api/files/delete/mem/docs/hello%20world.txt",
                Bytes::new(),
                Some(&token),
            ))
            .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert!(deleted.body().is_empty());

        let gone = dispatcher
            .dispatch(get(
                "/api/files/stat/mem/docs/hello%20world.txt",
                Some(&token),
            ))
            .await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mounts_are_independent() {
        let dispatcher = dispatcher().await;
        let token = login(&dispatcher).await;

        dispatcher
            .dispatch(request(
                Method::PUT,
                "/api/files/upload/mem/a.txt",
                Bytes::from_static(b"a"),
                Some(&token),
            ))
            .await;

        let other = dispatcher
            .dispatch(get("/api/files/download/scratch/a.txt", Some(&token)))
            .await;
        assert_eq!(other.status(), StatusCode::NOT_FOUND);

        let unknown = dispatcher
            .dispatch(get("/api/files/download/nowhere/a.txt", Some(&token)))
            .await;
        let body: serde_json::Value = serde_json::from_slice(unknown.body()).unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "provider_not_found");
    }

    #[tokio::test]
    async fn test_stat_requires_resource() {
        let dispatcher = dispatcher().await;
        let token = login(&dispatcher).await;

        let response = dispatcher
            .dispatch(get("/api/files/stat", Some(&token)))
            .await;

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "routing");
    }

    #[tokio::test]
    async fn test_duplicate_mkdir_is_409() {
        let dispatcher = dispatcher().await;
        let token = login(&dispatcher).await;
        let mkdir = || {
            request(
                Method::POST,
                "/api/files/mkdir/scratch/d",
                Bytes::new(),
                Some(&token),
            )
        };

        assert_eq!(dispatcher.dispatch(mkdir()).await.status(), StatusCode::CREATED);
        assert_eq!(dispatcher.dispatch(mkdir()).await.status(), StatusCode::CONFLICT);
    }
}
