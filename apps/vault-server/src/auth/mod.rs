// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the vault API.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /auth/code/request` with `{email, device_id}` and
//!    receives a 6-letter one-time code (valid 10 minutes)
//! 2. Client calls `POST /auth/code/verify` with `{code, device_id}` and
//!    receives an opaque session token (valid 60 minutes)
//! 3. Client sends `Authorization: Bearer <token>` on every other request;
//!    the [`Auth`] extractor resolves it to an `AuthenticatedSession`
//!
//! ## Security
//!
//! - Codes and tokens come from the OS CSPRNG
//! - Codes are single use and bound to the requesting device
//! - Codes and tokens are never logged

pub mod credentials;
pub mod error;
pub mod extractor;

pub use error::AuthError;
pub use extractor::Auth;
