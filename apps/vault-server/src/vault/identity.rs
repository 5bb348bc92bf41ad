// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User accounts and one-time code issuance.
//!
//! Accounts are created implicitly on the first code request for an email.
//! Emails are compared exactly as stored; no case folding is applied.

use chrono::{DateTime, Duration, Utc};

use crate::storage::{OneTimeCode, UnitOfWork, User, VaultDb};

use super::error::{VaultError, VaultResult};

/// Lifetime of a one-time code.
pub const CODE_TTL_MINUTES: i64 = 10;

pub struct IdentityStore<'a> {
    db: &'a VaultDb,
}

impl<'a> IdentityStore<'a> {
    pub fn new(db: &'a VaultDb) -> Self {
        Self { db }
    }

    pub fn find_user_by_email(&self, email: &str) -> VaultResult<Option<User>> {
        Ok(self.db.find_user_by_email(email)?)
    }

    /// Load the user behind an authenticated session.
    ///
    /// Users are never deleted, so a missing row here is an inconsistency.
    pub fn get_user(&self, user_id: &str) -> VaultResult<User> {
        self.db
            .get_user(user_id)?
            .ok_or_else(|| VaultError::Internal(format!("user {user_id} has no account row")))
    }

    /// Return the user for `email`, creating an unpaid account if none exists.
    ///
    /// A concurrent creator committing first surfaces as
    /// [`VaultError::DuplicateIdentity`] when this unit commits or inserts;
    /// callers retry the whole unit, which then finds the row.
    pub fn get_or_create_user(
        &self,
        uow: &UnitOfWork,
        email: &str,
        now: DateTime<Utc>,
    ) -> VaultResult<User> {
        if let Some(user) = uow.find_user_by_email(email)? {
            return Ok(user);
        }

        let user = User::new(email, now);
        uow.insert_user(&user)?;
        tracing::info!(user_id = %user.id, "Created user account");
        Ok(user)
    }

    /// Persist a code for (user, device) that expires after [`CODE_TTL_MINUTES`].
    ///
    /// Earlier outstanding codes for the same device stay valid until they
    /// expire or are consumed.
    pub fn issue_one_time_code(
        &self,
        uow: &UnitOfWork,
        user: &User,
        device_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> VaultResult<OneTimeCode> {
        let record = OneTimeCode {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            code: code.to_string(),
            device_id: device_id.to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
        };
        uow.insert_code(&record)?;
        tracing::debug!(user_id = %user.id, device_id, "Issued one-time code");
        Ok(record)
    }
}
