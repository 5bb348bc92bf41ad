// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File endpoints: upload, download, list, delete, share.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{FileListResponse, ShareFileRequest, StatusResponse, UploadResponse},
    state::AppState,
    vault::{VaultError, VaultResult},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Name to store the file under.
    pub file_name: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FileIdQuery {
    pub file_id: String,
}

/// Upload a file. The request body is the raw file content.
#[utoipa::path(
    post,
    path = "/file/upload",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    tag = "Files",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Free storage limit exceeded"),
        (status = 413, description = "Upload larger than the server's body limit"),
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Query(params): Query<UploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, ApiError> {
    if params.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("file_name is required"));
    }

    let limit = UploadLimit {
        max_body: state.max_upload_bytes,
        headroom: state.vault.upload_headroom(&session)?,
    };
    if let Some(declared) = content_length(&headers) {
        limit.admit(declared)?;
    }
    let bytes = to_bytes(body, limit.read_cap()).await.map_err(|e| {
        tracing::debug!(user_id = session.user_id(), error = %e, "Upload body rejected");
        limit.exceeded()
    })?;

    let vault = Arc::clone(&state.vault);
    let receipt =
        run_blocking(move || vault.upload(&session, &bytes, &params.file_name)).await?;
    Ok(Json(receipt.into()))
}

/// How much of an upload body may be read: the configured maximum, or the
/// caller's remaining free-tier quota when that is smaller.
#[derive(Debug, Clone, Copy)]
struct UploadLimit {
    max_body: usize,
    /// `None` for paid accounts.
    headroom: Option<u64>,
}

impl UploadLimit {
    fn quota_bound(&self) -> bool {
        self.headroom.is_some_and(|room| room < self.max_body as u64)
    }

    fn read_cap(&self) -> usize {
        match self.headroom {
            Some(room) if room < self.max_body as u64 => room as usize,
            _ => self.max_body,
        }
    }

    /// Refuse a declared `Content-Length` before any of the body is read.
    fn admit(&self, declared: u64) -> Result<(), ApiError> {
        if self.headroom.is_some_and(|room| declared > room) {
            return Err(VaultError::QuotaExceeded.into());
        }
        if declared > self.max_body as u64 {
            return Err(ApiError::payload_too_large(self.max_body));
        }
        Ok(())
    }

    fn exceeded(&self) -> ApiError {
        if self.quota_bound() {
            VaultError::QuotaExceeded.into()
        } else {
            ApiError::payload_too_large(self.max_body)
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Run a vault call on tokio's blocking pool.
async fn run_blocking<T, F>(call: F) -> Result<T, ApiError>
where
    F: FnOnce() -> VaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(call).await.map_err(|e| {
        tracing::error!(error = %e, "Vault task join error");
        ApiError::internal()
    })?;
    Ok(result?)
}

/// Download a file the caller owns or that was shared with them.
#[utoipa::path(
    get,
    path = "/file/download",
    params(FileIdQuery),
    tag = "Files",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "File content", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "File missing or not accessible"),
        (status = 500, description = "Stored file failed integrity verification"),
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Query(params): Query<FileIdQuery>,
) -> Result<Response, ApiError> {
    let vault = Arc::clone(&state.vault);
    let file = run_blocking(move || vault.download(&session, &params.file_id)).await?;
    let disposition = content_disposition(&file.file_name);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// `attachment; filename="…"` with characters that cannot appear in a
/// quoted header value replaced by `_`.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// List owned files and files shared with the caller.
#[utoipa::path(
    get,
    path = "/file/list",
    tag = "Files",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "File listing", body = FileListResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Auth(session): Auth,
) -> Result<Json<FileListResponse>, ApiError> {
    let listing = state.vault.list_files(&session)?;
    Ok(Json(listing.into()))
}

/// Delete an owned file and release its storage.
#[utoipa::path(
    delete,
    path = "/file/delete",
    params(FileIdQuery),
    tag = "Files",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "File deleted", body = StatusResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "File missing or not owned by the caller"),
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Query(params): Query<FileIdQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.vault.delete_file(&session, &params.file_id)?;
    Ok(Json(StatusResponse::ok()))
}

/// Give a registered user read access to an owned file.
#[utoipa::path(
    post,
    path = "/file/share",
    request_body = ShareFileRequest,
    tag = "Files",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "File shared", body = StatusResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Caller does not own the file"),
        (status = 404, description = "No user registered under that email"),
    )
)]
pub async fn share_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<ShareFileRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .vault
        .share_file(&session, &request.file_id, &request.email)?;
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn quota_headroom_caps_the_read_for_free_accounts() {
        let limit = UploadLimit {
            max_body: 1_000,
            headroom: Some(40),
        };
        assert_eq!(limit.read_cap(), 40);
        assert!(limit.admit(40).is_ok());
        assert_eq!(limit.admit(41).unwrap_err().status, StatusCode::FORBIDDEN);
        assert_eq!(limit.exceeded().error_code, "quota_exceeded");
    }

    #[test]
    fn body_limit_applies_when_quota_is_not_the_tighter_bound() {
        let paid = UploadLimit {
            max_body: 1_000,
            headroom: None,
        };
        assert_eq!(paid.read_cap(), 1_000);
        assert_eq!(
            paid.admit(1_001).unwrap_err().status,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(paid.exceeded().error_code, "payload_too_large");

        let roomy = UploadLimit {
            max_body: 1_000,
            headroom: Some(u64::MAX),
        };
        assert_eq!(roomy.read_cap(), 1_000);
        assert_eq!(roomy.exceeded().error_code, "payload_too_large");
    }

    #[test]
    fn content_length_is_parsed_when_present() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("512"));
        assert_eq!(content_length(&headers), Some(512));
    }

    #[test]
    fn content_disposition_quotes_plain_names() {
        assert_eq!(
            content_disposition("report 2024.pdf"),
            "attachment; filename=\"report 2024.pdf\""
        );
    }

    #[test]
    fn content_disposition_neutralizes_header_breaking_characters() {
        let value = content_disposition("evil\"\r\nX-Injected: 1.txt");
        let text = value.to_str().unwrap();
        assert_eq!(text, "attachment; filename=\"evil___X-Injected: 1.txt\"");
    }

    #[test]
    fn content_disposition_replaces_non_ascii() {
        assert_eq!(
            content_disposition("résumé.txt"),
            "attachment; filename=\"r_sum_.txt\""
        );
    }
}
