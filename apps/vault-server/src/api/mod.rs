// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CodeRequest, CodeResponse, FileListResponse, OwnedFileEntry, ShareFileRequest,
        SharedFileEntry, StatusResponse, StorageStatusResponse, UploadResponse,
        VerifyCodeRequest, VerifyCodeResponse,
    },
    state::AppState,
};

pub mod files;
pub mod health;
pub mod session;
pub mod users;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/auth/code/request", post(session::request_code))
        .route("/auth/code/verify", post(session::verify_code))
        .route("/auth/logout", post(session::logout))
        // Reads the raw body itself, capped by max_upload_bytes and quota headroom
        .route("/file/upload", post(files::upload_file))
        .route("/file/download", get(files::download_file))
        .route("/file/list", get(files::list_files))
        .route("/file/delete", delete(files::delete_file))
        .route("/file/share", post(files::share_file))
        .route("/user/storage", get(users::get_storage_status))
        .route("/user/upgrade", post(users::upgrade))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        session::request_code,
        session::verify_code,
        session::logout,
        files::upload_file,
        files::download_file,
        files::list_files,
        files::delete_file,
        files::share_file,
        users::get_storage_status,
        users::upgrade
    ),
    components(
        schemas(
            CodeRequest,
            CodeResponse,
            VerifyCodeRequest,
            VerifyCodeResponse,
            StatusResponse,
            UploadResponse,
            OwnedFileEntry,
            SharedFileEntry,
            FileListResponse,
            ShareFileRequest,
            StorageStatusResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "One-time code login and sessions"),
        (name = "Files", description = "Encrypted file storage and sharing"),
        (name = "Users", description = "Storage usage and tier"),
        (name = "Health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
