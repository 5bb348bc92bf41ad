// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI document served at `/docs`.
//!
//! ## Model Categories
//!
//! - **Auth**: one-time code request and verification
//! - **Files**: upload receipts, listings, sharing
//! - **Users**: storage usage and tier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::vault::{FileListing, OwnedFile, SharedFile, StorageStatus, UploadReceipt};

// =============================================================================
// Auth Models
// =============================================================================

/// Request a one-time login code for an email on a device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CodeRequest {
    /// Login email. Unseen emails are registered on first request.
    pub email: String,
    /// Caller-chosen device identifier the code is bound to.
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CodeResponse {
    /// 6-letter code, valid for 10 minutes.
    pub code: String,
}

/// Exchange a code for a session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VerifyCodeRequest {
    pub code: String,
    /// Must match the device the code was requested for.
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VerifyCodeResponse {
    /// Bearer token, valid for 60 minutes.
    pub session_token: String,
}

/// Generic acknowledgement body: `{"status": "ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

// =============================================================================
// File Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UploadResponse {
    pub file_id: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub checksum: String,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            file_id: receipt.file_id,
            checksum: receipt.checksum,
        }
    }
}

/// A file owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct OwnedFileEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
}

impl From<OwnedFile> for OwnedFileEntry {
    fn from(file: OwnedFile) -> Self {
        Self {
            id: file.id,
            created_at: file.created_at,
            file_name: file.file_name,
        }
    }
}

/// A file another user shared with the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SharedFileEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub owner_user_id: String,
    pub shared_at: DateTime<Utc>,
}

impl From<SharedFile> for SharedFileEntry {
    fn from(file: SharedFile) -> Self {
        Self {
            id: file.id,
            created_at: file.created_at,
            file_name: file.file_name,
            owner_user_id: file.owner_user_id,
            shared_at: file.shared_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileListResponse {
    pub owned_files: Vec<OwnedFileEntry>,
    pub shared_files: Vec<SharedFileEntry>,
}

impl From<FileListing> for FileListResponse {
    fn from(listing: FileListing) -> Self {
        Self {
            owned_files: listing.owned.into_iter().map(Into::into).collect(),
            shared_files: listing.shared.into_iter().map(Into::into).collect(),
        }
    }
}

/// Grant read access on an owned file to a registered user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ShareFileRequest {
    pub file_id: String,
    /// Email of the grantee. Must already be registered.
    pub email: String,
}

// =============================================================================
// User Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StorageStatusResponse {
    /// Plaintext bytes currently stored.
    pub current_storage_bytes: u64,
    pub is_paid: bool,
}

impl From<StorageStatus> for StorageStatusResponse {
    fn from(status: StorageStatus) -> Self {
        Self {
            current_storage_bytes: status.current_storage_bytes,
            is_paid: status.is_paid,
        }
    }
}
