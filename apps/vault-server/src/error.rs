// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::vault::VaultError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            format!("Upload exceeds the {limit} byte limit"),
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }
}

/// The single mapping from core failures to HTTP responses.
///
/// A missing file and a file the caller may not touch produce the same
/// response, so existence of other users' files is not observable.
impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::InvalidOrExpiredCode => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_code",
                "Invalid or expired code",
            ),
            VaultError::InvalidOrExpiredSession => Self::new(
                StatusCode::UNAUTHORIZED,
                "invalid_session",
                "Session is invalid or expired",
            ),
            VaultError::UserNotFound => {
                Self::new(StatusCode::NOT_FOUND, "user_not_found", "User not found")
            }
            VaultError::AccessDenied | VaultError::FileNotFound => Self::new(
                StatusCode::FORBIDDEN,
                "permission_denied",
                "Permission denied",
            ),
            VaultError::QuotaExceeded => Self::new(
                StatusCode::FORBIDDEN,
                "quota_exceeded",
                "Free storage limit exceeded",
            ),
            VaultError::IntegrityFailure(detail) => {
                tracing::error!(error = %detail, "Stored file failed integrity check");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "integrity_failure",
                    "Stored file failed integrity verification",
                )
            }
            VaultError::DuplicateIdentity(_) => Self::new(
                StatusCode::CONFLICT,
                "duplicate_identity",
                "Account was created concurrently, retry the request",
            ),
            VaultError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal vault error");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
