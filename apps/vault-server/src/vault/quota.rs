// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user storage accounting and the free-tier ceiling.
//!
//! Usage is counted in plaintext bytes. The ceiling is checked twice: once
//! against a snapshot before any ciphertext is written, so hopeless uploads
//! fail early, and again inside the unit of work that charges the counter.
//! Units of work are serialized, so the second check sees every charge that
//! committed before it and concurrent uploads cannot overshoot the ceiling.

use crate::storage::{UnitOfWork, User};

use super::error::{VaultError, VaultResult};

/// Free-tier ceiling: 5 GiB of plaintext.
pub const FREE_TIER_LIMIT_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Direction of a change to a user's storage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDelta {
    Consume(u64),
    Release(u64),
}

/// Fail with [`VaultError::QuotaExceeded`] if an unpaid user cannot take
/// `incoming_bytes` more. Paid users always pass.
pub fn check_and_reserve(user: &User, incoming_bytes: u64) -> VaultResult<()> {
    if user.is_paid {
        return Ok(());
    }

    let projected = user.current_storage.saturating_add(incoming_bytes);
    if projected > FREE_TIER_LIMIT_BYTES {
        tracing::info!(
            user_id = %user.id,
            current = user.current_storage,
            incoming = incoming_bytes,
            "Upload rejected by free-tier quota"
        );
        return Err(VaultError::QuotaExceeded);
    }
    Ok(())
}

/// Bytes an unpaid user may still store, or `None` when the account is
/// unbounded.
pub fn headroom(user: &User) -> Option<u64> {
    (!user.is_paid).then(|| FREE_TIER_LIMIT_BYTES.saturating_sub(user.current_storage))
}

/// Apply `delta` to the user's counter inside `uow`. Never drops below zero.
///
/// Consumption re-checks the ceiling against the row read inside `uow`.
pub fn commit_usage(uow: &UnitOfWork, user_id: &str, delta: UsageDelta) -> VaultResult<User> {
    let mut user = uow
        .get_user(user_id)?
        .ok_or_else(|| VaultError::Internal(format!("user {user_id} has no account row")))?;

    user.current_storage = match delta {
        UsageDelta::Consume(bytes) => {
            check_and_reserve(&user, bytes)?;
            user.current_storage.saturating_add(bytes)
        }
        UsageDelta::Release(bytes) => user.current_storage.saturating_sub(bytes),
    };
    uow.update_user(&user)?;
    Ok(user)
}

/// Mark the user as paid. Idempotent; consumed storage is untouched.
pub fn upgrade_to_paid(uow: &UnitOfWork, user_id: &str) -> VaultResult<User> {
    let mut user = uow
        .get_user(user_id)?
        .ok_or_else(|| VaultError::Internal(format!("user {user_id} has no account row")))?;

    if !user.is_paid {
        user.is_paid = true;
        uow.update_user(&user)?;
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VaultDb;
    use chrono::Utc;

    fn user_with(current_storage: u64, is_paid: bool) -> User {
        User {
            current_storage,
            is_paid,
            ..User::new("q@example.com", Utc::now())
        }
    }

    #[test]
    fn free_user_at_the_edge() {
        let user = user_with(FREE_TIER_LIMIT_BYTES - 10, false);
        assert!(check_and_reserve(&user, 10).is_ok());
        assert!(matches!(
            check_and_reserve(&user, 11),
            Err(VaultError::QuotaExceeded)
        ));
    }

    #[test]
    fn paid_user_is_unbounded() {
        let user = user_with(FREE_TIER_LIMIT_BYTES * 3, true);
        assert!(check_and_reserve(&user, u64::MAX).is_ok());
    }

    #[test]
    fn counter_moves_in_both_directions_and_floors_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let db = VaultDb::open(&dir.path().join("vault.redb")).unwrap();
        let user = User::new("q@example.com", Utc::now());

        let uow = db.begin().unwrap();
        uow.insert_user(&user).unwrap();
        let after_add = commit_usage(&uow, &user.id, UsageDelta::Consume(100)).unwrap();
        let after_release = commit_usage(&uow, &user.id, UsageDelta::Release(40)).unwrap();
        let floored = commit_usage(&uow, &user.id, UsageDelta::Release(1_000)).unwrap();
        uow.commit().unwrap();

        assert_eq!(after_add.current_storage, 100);
        assert_eq!(after_release.current_storage, 60);
        assert_eq!(floored.current_storage, 0);
    }

    #[test]
    fn headroom_shrinks_to_zero_and_paid_is_unbounded() {
        assert_eq!(headroom(&user_with(0, false)), Some(FREE_TIER_LIMIT_BYTES));
        assert_eq!(headroom(&user_with(FREE_TIER_LIMIT_BYTES - 3, false)), Some(3));
        assert_eq!(headroom(&user_with(FREE_TIER_LIMIT_BYTES + 9, false)), Some(0));
        assert_eq!(headroom(&user_with(FREE_TIER_LIMIT_BYTES, true)), None);
    }

    #[test]
    fn consuming_past_the_ceiling_is_refused_inside_the_unit_of_work() {
        let dir = tempfile::tempdir().unwrap();
        let db = VaultDb::open(&dir.path().join("vault.redb")).unwrap();
        let user = user_with(FREE_TIER_LIMIT_BYTES - 5, false);

        let uow = db.begin().unwrap();
        uow.insert_user(&user).unwrap();
        assert!(matches!(
            commit_usage(&uow, &user.id, UsageDelta::Consume(6)),
            Err(VaultError::QuotaExceeded)
        ));
        let filled = commit_usage(&uow, &user.id, UsageDelta::Consume(5)).unwrap();
        assert_eq!(filled.current_storage, FREE_TIER_LIMIT_BYTES);
    }

    #[test]
    fn upgrade_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = VaultDb::open(&dir.path().join("vault.redb")).unwrap();
        let user = User::new("q@example.com", Utc::now());

        let uow = db.begin().unwrap();
        uow.insert_user(&user).unwrap();
        commit_usage(&uow, &user.id, UsageDelta::Consume(7)).unwrap();
        assert!(upgrade_to_paid(&uow, &user.id).unwrap().is_paid);
        let again = upgrade_to_paid(&uow, &user.id).unwrap();
        uow.commit().unwrap();

        assert!(again.is_paid);
        assert_eq!(again.current_storage, 7);
    }
}
