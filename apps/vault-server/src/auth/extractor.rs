// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated sessions.
//!
//! Use the `Auth` extractor in handlers to require a live session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(session): Auth) -> impl IntoResponse {
//!     // session is AuthenticatedSession
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;
use crate::state::AppState;
use crate::vault::{AuthenticatedSession, VaultError};

/// Extractor for authenticated sessions.
///
/// Reads `Authorization: Bearer <token>` and resolves the token through the
/// vault. Unknown, revoked and expired tokens are all rejected the same way.
pub struct Auth(pub AuthenticatedSession);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        match state.vault.authenticate(token) {
            Ok(session) => Ok(Auth(session)),
            Err(VaultError::InvalidOrExpiredSession) => Err(AuthError::InvalidOrExpiredSession),
            Err(other) => Err(AuthError::InternalError(other.to_string())),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::vault::Vault;
    use axum::http::Request;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = VaultConfig::new(temp_dir.path(), [1u8; 32]);
        let vault = Vault::open(&config).expect("Failed to open vault");
        (AppState::new(Arc::new(vault)), temp_dir)
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = parts_with(Some("Bearer not-a-real-token"));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidOrExpiredSession)));
    }

    #[tokio::test]
    async fn auth_extractor_resolves_live_session() {
        let (state, _temp_dir) = create_test_state();
        let code = state.vault.request_code("alice@example.com", "laptop").unwrap();
        let token = state.vault.verify_code(&code, "laptop").unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let Auth(session) = Auth::from_request_parts(&mut parts, &state)
            .await
            .expect("live token resolves");
        assert_eq!(session.device_id(), "laptop");
    }
}
