// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership and read-access decisions for stored files.
//!
//! Only the owner may delete or share a file. The owner and any user holding
//! a share grant may read it.

use crate::storage::{FileRecord, VaultDb};

use super::error::{VaultError, VaultResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    fn owner_user_id(&self) -> &str;
}

impl OwnedResource for FileRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// Ownership checks available on every [`OwnedResource`].
pub trait OwnershipEnforcer {
    fn is_owned_by(&self, user_id: &str) -> bool;

    /// # Errors
    /// Returns `VaultError::AccessDenied` if `user_id` is not the owner.
    fn verify_ownership(&self, user_id: &str) -> VaultResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id() == user_id
    }

    fn verify_ownership(&self, user_id: &str) -> VaultResult<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(VaultError::AccessDenied)
        }
    }
}

pub struct AccessControl<'a> {
    db: &'a VaultDb,
}

impl<'a> AccessControl<'a> {
    pub fn new(db: &'a VaultDb) -> Self {
        Self { db }
    }

    /// True iff the file exists and `user_id` owns it.
    pub fn is_owner(&self, user_id: &str, file_id: &str) -> VaultResult<bool> {
        Ok(self
            .db
            .get_file(file_id)?
            .is_some_and(|file| file.is_owned_by(user_id)))
    }

    /// True iff the file exists and `user_id` owns it or holds a grant on it.
    pub fn authorize_read(&self, user_id: &str, file_id: &str) -> VaultResult<bool> {
        match self.db.get_file(file_id)? {
            Some(file) => self.can_read(user_id, &file),
            None => Ok(false),
        }
    }

    /// Read check against an already loaded file row.
    pub fn can_read(&self, user_id: &str, file: &FileRecord) -> VaultResult<bool> {
        if file.is_owned_by(user_id) {
            return Ok(true);
        }
        Ok(self.db.find_share(&file.id, user_id)?.is_some())
    }
}
