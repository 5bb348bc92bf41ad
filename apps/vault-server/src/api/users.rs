// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{StatusResponse, StorageStatusResponse},
    state::AppState,
};

/// Get the caller's storage usage and tier.
#[utoipa::path(
    get,
    path = "/user/storage",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Storage usage", body = StorageStatusResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_storage_status(
    State(state): State<AppState>,
    Auth(session): Auth,
) -> Result<Json<StorageStatusResponse>, ApiError> {
    let status = state.vault.storage_status(&session)?;
    Ok(Json(status.into()))
}

/// Move the caller to the paid tier, lifting the storage limit.
///
/// No payment is collected.
#[utoipa::path(
    post,
    path = "/user/upgrade",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account upgraded", body = StatusResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn upgrade(
    State(state): State<AppState>,
    Auth(session): Auth,
) -> Result<Json<StatusResponse>, ApiError> {
    state.vault.upgrade(&session)?;
    Ok(Json(StatusResponse::ok()))
}
