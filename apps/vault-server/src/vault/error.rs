// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failure taxonomy of the vault core.
//!
//! Every operation reports one of these kinds. The HTTP boundary maps them
//! to status codes in exactly one place (`crate::error`); nothing else in
//! the crate inspects store or filesystem errors directly.

use crate::storage::DbError;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// No unexpired code matches the (code, device) pair.
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    /// Token unknown, revoked, or past its TTL.
    #[error("invalid or expired session")]
    InvalidOrExpiredSession,

    /// Email does not belong to a registered user.
    #[error("user not found")]
    UserNotFound,

    /// Caller is neither owner nor grantee of the file.
    #[error("access denied")]
    AccessDenied,

    /// File id absent, malformed, or not owned by the caller.
    #[error("file not found")]
    FileNotFound,

    /// Unpaid user would exceed the free-tier ceiling.
    #[error("free storage limit exceeded")]
    QuotaExceeded,

    /// Stored content failed decryption or checksum verification.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// Lost a race creating a user for this email; re-resolve by lookup.
    #[error("identity already exists: {0}")]
    DuplicateIdentity(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for VaultError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateEmail(email) => VaultError::DuplicateIdentity(email),
            other => VaultError::Internal(other.to_string()),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
