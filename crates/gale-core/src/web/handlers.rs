//! HTTP endpoint handlers for the Gale file API.
//!
//! Every operation checks the access policy first, using the caller's
//! socket address and the `Authorization` header as the out-of-band
//! credential, then resolves paths through the share root before any
//! disk access. Outcomes are logged per request.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::registry::Peer;
use crate::share::{DirEntry, EntryKind};
use crate::{archive::ArchiveJob, share::stream::FileStream};

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Dedicated filename header for archive downloads; some clients cannot
/// parse it out of content-disposition.
static ZIP_FILENAME: HeaderName = HeaderName::from_static("x-zip-filename");

/// Query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Path relative to the share root; empty means the root itself
    #[serde(default)]
    path: String,
}

/// Query parameters for the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Path of the file to download, relative to the share root
    path: String,
}

/// Query parameters for the zip endpoint.
#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    /// Comma-separated relative paths to package
    paths: String,
}

fn provided_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn check_access(state: &AppState, addr: SocketAddr, headers: &HeaderMap) -> ApiResult<()> {
    state
        .policy
        .check(addr.ip(), provided_secret(headers))
        .map_err(|e| {
            tracing::warn!(client = %addr.ip(), "{}", e);
            ApiError::from(e)
        })
}

fn log_access(addr: SocketAddr, action: &str, path: &str, ok: bool) {
    if ok {
        tracing::info!(client = %addr.ip(), action, path, "ok");
    } else {
        tracing::warn!(client = %addr.ip(), action, path, "failed");
    }
}

/// GET / - Service status.
pub async fn get_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "version": crate::VERSION,
    }))
}

/// GET /api/files/list - List one directory's immediate children.
pub async fn list_files(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<DirEntry>>> {
    check_access(&state, addr, &headers)?;

    let result = state
        .share
        .resolve(&query.path)
        .and_then(|dir| state.share.list(&dir));

    match result {
        Ok(mut entries) => {
            // Stable presentation: directories first, then by name.
            entries.sort_by(|a, b| match (a.kind, b.kind) {
                (EntryKind::Directory, EntryKind::File) => std::cmp::Ordering::Less,
                (EntryKind::File, EntryKind::Directory) => std::cmp::Ordering::Greater,
                _ => a.name.cmp(&b.name),
            });
            log_access(addr, "LIST", &query.path, true);
            Ok(Json(entries))
        }
        Err(e) => {
            log_access(addr, "LIST", &query.path, false);
            Err(e.into())
        }
    }
}

/// GET /api/files/download - Stream a file, honoring an optional byte
/// range.
pub async fn download_file(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    check_access(&state, addr, &headers)?;

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let opened = match state.share.resolve(&query.path) {
        Ok(resolved) => FileStream::open(&resolved, range_header).await,
        Err(e) => Err(e),
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            log_access(addr, "DOWNLOAD", &query.path, false);
            return Err(e.into());
        }
    };

    log_access(addr, "DOWNLOAD", &query.path, true);

    let status = if stream.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, stream.content_length())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", stream.file_name()),
        );

    if let Some(content_range) = stream.content_range() {
        response = response.header(header::CONTENT_RANGE, content_range);
    }

    Ok(response
        .body(Body::from_stream(stream.into_stream()))
        .unwrap())
}

/// GET /api/files/zip - Package a selection of paths and stream the
/// archive.
pub async fn download_zip(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<ZipQuery>,
) -> ApiResult<Response> {
    check_access(&state, addr, &headers)?;

    let paths: Vec<String> = query
        .paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    let job = match ArchiveJob::build(&state.share, &paths, &state.staging_dir).await {
        Ok(job) => job,
        Err(e) => {
            log_access(addr, "ZIP", &query.paths, false);
            return Err(e.into());
        }
    };

    log_access(addr, "ZIP", &query.paths, true);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, job.size())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", job.file_name()),
        )
        .header(ZIP_FILENAME.clone(), job.file_name())
        .body(Body::from_stream(job.into_stream()))
        .unwrap())
}

/// GET /api/devices - Peers seen within the liveness window.
pub async fn list_devices(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Peer>>> {
    check_access(&state, addr, &headers)?;

    let peers = state.registry.snapshot(state.liveness_window).await;
    Ok(Json(peers))
}
