// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time code login and logout endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CodeRequest, CodeResponse, StatusResponse, VerifyCodeRequest, VerifyCodeResponse},
    state::AppState,
};

/// Request a one-time login code.
///
/// Registers the email on first use. The code is returned directly in the
/// response body; there is no out-of-band delivery.
#[utoipa::path(
    post,
    path = "/auth/code/request",
    request_body = CodeRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Code issued", body = CodeResponse),
        (status = 400, description = "Missing email or device id"),
        (status = 409, description = "Account was created concurrently, retry"),
    )
)]
pub async fn request_code(
    State(state): State<AppState>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    if request.email.trim().is_empty() || request.device_id.trim().is_empty() {
        return Err(ApiError::bad_request("email and device_id are required"));
    }

    let code = state
        .vault
        .request_code(&request.email, &request.device_id)?;
    Ok(Json(CodeResponse { code }))
}

/// Exchange a one-time code for a session token.
#[utoipa::path(
    post,
    path = "/auth/code/verify",
    request_body = VerifyCodeRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session issued", body = VerifyCodeResponse),
        (status = 400, description = "Invalid or expired code"),
    )
)]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, ApiError> {
    let session_token = state.vault.verify_code(&request.code, &request.device_id)?;
    Ok(Json(VerifyCodeResponse { session_token }))
}

/// Revoke the caller's session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session revoked", body = StatusResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Auth(session): Auth,
) -> Result<Json<StatusResponse>, ApiError> {
    state.vault.logout(&session)?;
    Ok(Json(StatusResponse::ok()))
}
