// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rows persisted in the vault database.
//!
//! Every row is stored as JSON under an opaque UUID-shaped key. See
//! [`super::database`] for the table layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account, created on the first code request for an unseen email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier (UUID)
    pub id: String,
    /// Login email, unique and compared exactly as stored
    pub email: String,
    /// Paid accounts are not bound by the free-tier quota
    pub is_paid: bool,
    /// Plaintext bytes currently stored by this user
    pub current_storage: u64,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh unpaid account with zero consumed storage.
    pub fn new(email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            is_paid: false,
            current_storage: 0,
            created_at: now,
        }
    }
}

/// A single-use login code bound to a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneTimeCode {
    pub id: String,
    pub user_id: String,
    pub code: String,
    /// Caller-supplied device identifier, not verified
    pub device_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Identity carried by a session for its whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: String,
    pub device_id: String,
}

/// An issued session, keyed by its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// Opaque bearer token (unique)
    pub token: String,
    pub data: SessionData,
    pub created_at: DateTime<Utc>,
    /// Fixed at issuance; never extended
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Metadata for one stored file. The bytes live in the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique file identifier (UUID)
    pub id: String,
    /// Hex SHA-256 of the plaintext
    pub checksum: String,
    pub owner_user_id: String,
    /// Content store handle of the ciphertext
    pub location: String,
    /// Original file name as uploaded
    pub file_name: String,
    /// Plaintext length, charged against the owner's quota
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Permission carried by a share grant. Only read access exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    #[default]
    Read,
}

/// Read access to one file granted by its owner to another user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareGrant {
    pub id: String,
    pub file_id: String,
    pub shared_user_id: String,
    #[serde(default)]
    pub permission: SharePermission,
    pub shared_at: DateTime<Utc>,
}
