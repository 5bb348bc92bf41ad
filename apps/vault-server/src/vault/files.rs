// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The file vault: encrypted storage, retrieval, listing, deletion and
//! sharing of user files.
//!
//! ## Write path
//!
//! ```text
//! quota check ─► checksum(plaintext) ─► encrypt ─► write blob
//!             ─► [unit of work: insert FileRecord + consume quota] ─► commit
//! ```
//!
//! The quota check runs before any byte reaches the content store. If the
//! unit of work fails after the blob was written, the blob is removed again.
//!
//! ## Delete path
//!
//! The record and the quota release commit first. Blob removal follows and
//! is best effort: a failure leaves an orphaned blob, which is logged and
//! never resurrects the record.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::storage::{
    Cipher, ContentStore, FileRecord, ShareGrant, SharePermission, StorageError, VaultDb,
};

use super::access::{AccessControl, OwnershipEnforcer};
use super::clock::Clock;
use super::error::{VaultError, VaultResult};
use super::quota::{self, UsageDelta};

/// Plaintext and metadata of a successful retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub checksum: String,
}

/// Listing entry for a file the caller owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFile {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
}

/// Listing entry for a file shared with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub owner_user_id: String,
    pub shared_at: DateTime<Utc>,
}

/// Hex SHA-256 of `bytes`.
pub fn checksum_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Normalize a caller-supplied file id. Anything that is not a UUID cannot
/// name a stored file.
fn parse_file_id(file_id: &str) -> VaultResult<String> {
    uuid::Uuid::parse_str(file_id)
        .map(|id| id.to_string())
        .map_err(|_| VaultError::FileNotFound)
}

pub struct FileVault<'a> {
    db: &'a VaultDb,
    content: &'a ContentStore,
    cipher: &'a dyn Cipher,
    clock: &'a dyn Clock,
}

impl<'a> FileVault<'a> {
    pub fn new(
        db: &'a VaultDb,
        content: &'a ContentStore,
        cipher: &'a dyn Cipher,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            db,
            content,
            cipher,
            clock,
        }
    }

    /// Encrypt and persist `plaintext` as a new file owned by `user_id`.
    pub fn store(&self, user_id: &str, plaintext: &[u8], file_name: &str) -> VaultResult<FileRecord> {
        let owner = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| VaultError::Internal(format!("user {user_id} has no account row")))?;
        let size_bytes = plaintext.len() as u64;
        quota::check_and_reserve(&owner, size_bytes)?;

        let checksum = checksum_hex(plaintext);
        let sealed = self
            .cipher
            .encrypt(plaintext)
            .map_err(|e| VaultError::Internal(format!("encryption failed: {e}")))?;

        let location = uuid::Uuid::new_v4().to_string();
        self.content
            .write_blob(&location, &sealed)
            .map_err(|e| VaultError::Internal(e.to_string()))?;

        let record = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            checksum,
            owner_user_id: owner.id.clone(),
            location,
            file_name: file_name.to_string(),
            size_bytes,
            created_at: self.clock.now(),
        };

        if let Err(e) = self.commit_new_file(&record) {
            if let Err(cleanup) = self.content.delete_blob(&record.location) {
                tracing::warn!(
                    location = %record.location,
                    error = %cleanup,
                    "Failed to remove blob after aborted upload"
                );
            }
            return Err(e);
        }

        tracing::info!(
            user_id = %owner.id,
            file_id = %record.id,
            bytes = size_bytes,
            "Stored file"
        );
        Ok(record)
    }

    fn commit_new_file(&self, record: &FileRecord) -> VaultResult<()> {
        let uow = self.db.begin()?;
        uow.insert_file(record)?;
        quota::commit_usage(&uow, &record.owner_user_id, UsageDelta::Consume(record.size_bytes))?;
        uow.commit()?;
        Ok(())
    }

    /// Decrypt a file the caller owns or holds a read grant on.
    ///
    /// Authorization precedes any read of the content store. The decrypted
    /// bytes are checked against the persisted checksum before they are
    /// returned.
    pub fn retrieve(&self, user_id: &str, file_id: &str) -> VaultResult<RetrievedFile> {
        let file_id = parse_file_id(file_id)?;
        let file = self.db.get_file(&file_id)?.ok_or(VaultError::FileNotFound)?;

        if !AccessControl::new(self.db).can_read(user_id, &file)? {
            tracing::info!(user_id, file_id = %file.id, "Read denied");
            return Err(VaultError::AccessDenied);
        }

        let sealed = self.content.read_blob(&file.location).map_err(|e| match e {
            StorageError::NotFound(handle) => {
                VaultError::IntegrityFailure(format!("ciphertext missing at {handle}"))
            }
            other => VaultError::Internal(other.to_string()),
        })?;

        let bytes = self
            .cipher
            .decrypt(&sealed)
            .map_err(|e| VaultError::IntegrityFailure(e.to_string()))?;

        if checksum_hex(&bytes) != file.checksum {
            tracing::error!(file_id = %file.id, "Checksum mismatch after decryption");
            return Err(VaultError::IntegrityFailure(
                "checksum mismatch".to_string(),
            ));
        }

        tracing::debug!(user_id, file_id = %file.id, bytes = bytes.len(), "Retrieved file");
        Ok(RetrievedFile {
            bytes,
            file_name: file.file_name,
            checksum: file.checksum,
        })
    }

    /// Files owned by the caller, oldest first.
    pub fn list_owned(&self, user_id: &str) -> VaultResult<Vec<OwnedFile>> {
        let mut files = self.db.list_files_by_owner(user_id)?;
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(files
            .into_iter()
            .map(|f| OwnedFile {
                id: f.id,
                created_at: f.created_at,
                file_name: f.file_name,
            })
            .collect())
    }

    /// Files shared with the caller, oldest first.
    pub fn list_shared(&self, user_id: &str) -> VaultResult<Vec<SharedFile>> {
        let mut shared = self.db.list_shared_with(user_id)?;
        shared.sort_by(|(_, a), (_, b)| {
            a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
        });
        Ok(shared
            .into_iter()
            .map(|(grant, f)| SharedFile {
                id: f.id,
                created_at: f.created_at,
                file_name: f.file_name,
                owner_user_id: f.owner_user_id,
                shared_at: grant.shared_at,
            })
            .collect())
    }

    /// Delete a file the caller owns, releasing its quota and its grants.
    pub fn delete(&self, user_id: &str, file_id: &str) -> VaultResult<()> {
        let file_id = parse_file_id(file_id)?;

        let uow = self.db.begin()?;
        let file = uow.get_file(&file_id)?.ok_or(VaultError::FileNotFound)?;
        if !file.is_owned_by(user_id) {
            return Err(VaultError::FileNotFound);
        }

        uow.remove_file(&file.id)?;
        let revoked = uow.remove_shares_for_file(&file.id)?;
        quota::commit_usage(&uow, user_id, UsageDelta::Release(file.size_bytes))?;
        uow.commit()?;

        tracing::info!(
            user_id,
            file_id = %file.id,
            bytes = file.size_bytes,
            revoked_shares = revoked,
            "Deleted file"
        );

        if let Err(e) = self.content.delete_blob(&file.location) {
            tracing::warn!(
                file_id = %file.id,
                location = %file.location,
                error = %e,
                "Orphaned blob after delete"
            );
        }
        Ok(())
    }

    /// Grant read access on an owned file to the user registered under
    /// `grantee_email`.
    ///
    /// Sharing with oneself, or with someone who already holds a grant,
    /// succeeds without writing anything. A missing or malformed file id is
    /// [`VaultError::AccessDenied`], the same as a file owned by someone else.
    pub fn share(&self, owner_id: &str, file_id: &str, grantee_email: &str) -> VaultResult<()> {
        let file_id = parse_file_id(file_id).map_err(|_| VaultError::AccessDenied)?;

        let uow = self.db.begin()?;
        let file = uow.get_file(&file_id)?.ok_or(VaultError::AccessDenied)?;
        file.verify_ownership(owner_id)?;

        let grantee = uow
            .find_user_by_email(grantee_email)?
            .ok_or(VaultError::UserNotFound)?;

        if grantee.id == owner_id || uow.find_share(&file.id, &grantee.id)?.is_some() {
            return Ok(());
        }

        let grant = ShareGrant {
            id: uuid::Uuid::new_v4().to_string(),
            file_id: file.id.clone(),
            shared_user_id: grantee.id.clone(),
            permission: SharePermission::Read,
            shared_at: self.clock.now(),
        };
        uow.insert_share(&grant)?;
        uow.commit()?;

        tracing::info!(
            owner_id,
            file_id = %file.id,
            grantee_id = %grantee.id,
            "Shared file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AeadCipher, StoragePaths, User};
    use crate::vault::clock::ManualClock;
    use crate::vault::quota::FREE_TIER_LIMIT_BYTES;
    use chrono::Duration;

    struct Fixture {
        db: VaultDb,
        content: ContentStore,
        cipher: AeadCipher,
        clock: ManualClock,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let paths = StoragePaths::new(dir.path());
            let db = VaultDb::open(&paths.database_file()).unwrap();
            let mut content = ContentStore::new(paths);
            content.initialize().unwrap();
            Self {
                db,
                content,
                cipher: AeadCipher::new(&[3u8; 32]).unwrap(),
                clock: ManualClock::default(),
                _dir: dir,
            }
        }

        fn vault(&self) -> FileVault<'_> {
            FileVault::new(&self.db, &self.content, &self.cipher, &self.clock)
        }

        fn user(&self, email: &str) -> User {
            let user = User::new(email, self.clock.now());
            let uow = self.db.begin().unwrap();
            uow.insert_user(&user).unwrap();
            uow.commit().unwrap();
            user
        }

        fn storage_of(&self, user_id: &str) -> u64 {
            self.db.get_user(user_id).unwrap().unwrap().current_storage
        }
    }

    #[test]
    fn store_then_retrieve_round_trips() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");

        let record = f.vault().store(&alice.id, b"Hello, file!", "hello.txt").unwrap();
        assert_eq!(record.checksum, checksum_hex(b"Hello, file!"));
        assert_eq!(record.size_bytes, 12);
        assert_eq!(f.storage_of(&alice.id), 12);

        // Only ciphertext on disk
        let on_disk = f.content.read_blob(&record.location).unwrap();
        assert_ne!(on_disk, b"Hello, file!");

        let file = f.vault().retrieve(&alice.id, &record.id).unwrap();
        assert_eq!(file.bytes, b"Hello, file!");
        assert_eq!(file.file_name, "hello.txt");
    }

    #[test]
    fn quota_rejection_writes_nothing() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let uow = f.db.begin().unwrap();
        quota::commit_usage(&uow, &alice.id, UsageDelta::Consume(FREE_TIER_LIMIT_BYTES - 10))
            .unwrap();
        uow.commit().unwrap();

        assert!(matches!(
            f.vault().store(&alice.id, &[0u8; 20], "big.bin"),
            Err(VaultError::QuotaExceeded)
        ));
        assert!(f.vault().list_owned(&alice.id).unwrap().is_empty());
        assert_eq!(
            std::fs::read_dir(f.content.paths().blobs_dir()).unwrap().count(),
            0
        );

        f.vault().store(&alice.id, &[0u8; 5], "small.bin").unwrap();
        assert_eq!(f.storage_of(&alice.id), FREE_TIER_LIMIT_BYTES - 5);
    }

    /// Commits a charge for another upload the first time it is read,
    /// landing between the quota snapshot and the file's own commit.
    struct ConcurrentUploadClock<'a> {
        db: &'a VaultDb,
        user_id: String,
        bytes: u64,
        fired: std::sync::atomic::AtomicBool,
        inner: ManualClock,
    }

    impl Clock for ConcurrentUploadClock<'_> {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                let uow = self.db.begin().unwrap();
                quota::commit_usage(&uow, &self.user_id, UsageDelta::Consume(self.bytes)).unwrap();
                uow.commit().unwrap();
            }
            self.inner.now()
        }
    }

    #[test]
    fn failed_commit_removes_the_written_blob() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let uow = f.db.begin().unwrap();
        quota::commit_usage(&uow, &alice.id, UsageDelta::Consume(FREE_TIER_LIMIT_BYTES - 10))
            .unwrap();
        uow.commit().unwrap();

        let racing = ConcurrentUploadClock {
            db: &f.db,
            user_id: alice.id.clone(),
            bytes: 5,
            fired: std::sync::atomic::AtomicBool::new(false),
            inner: ManualClock::default(),
        };
        let vault = FileVault::new(&f.db, &f.content, &f.cipher, &racing);

        // 8 bytes fit the snapshot but not the counter after the concurrent charge
        assert!(matches!(
            vault.store(&alice.id, &[1u8; 8], "late.bin"),
            Err(VaultError::QuotaExceeded)
        ));
        assert_eq!(
            std::fs::read_dir(f.content.paths().blobs_dir()).unwrap().count(),
            0
        );
        assert!(f.vault().list_owned(&alice.id).unwrap().is_empty());
        assert_eq!(f.storage_of(&alice.id), FREE_TIER_LIMIT_BYTES - 5);
    }

    #[test]
    fn delete_reclaims_quota_and_blob() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let record = f.vault().store(&alice.id, b"some bytes", "a.txt").unwrap();

        f.vault().delete(&alice.id, &record.id).unwrap();

        assert_eq!(f.storage_of(&alice.id), 0);
        assert!(!f.content.exists(&record.location));
        assert!(matches!(
            f.vault().retrieve(&alice.id, &record.id),
            Err(VaultError::FileNotFound)
        ));
    }

    #[test]
    fn strangers_cannot_read_or_delete() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let eve = f.user("eve@example.com");
        let record = f.vault().store(&alice.id, b"private", "p.txt").unwrap();

        assert!(matches!(
            f.vault().retrieve(&eve.id, &record.id),
            Err(VaultError::AccessDenied)
        ));
        assert!(matches!(
            f.vault().delete(&eve.id, &record.id),
            Err(VaultError::FileNotFound)
        ));
        assert!(f.vault().list_owned(&eve.id).unwrap().is_empty());
        assert_eq!(f.storage_of(&alice.id), 7);
    }

    #[test]
    fn malformed_file_id_is_not_found() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        assert!(matches!(
            f.vault().retrieve(&alice.id, "not-a-uuid"),
            Err(VaultError::FileNotFound)
        ));
        assert!(matches!(
            f.vault().delete(&alice.id, "../../etc/passwd"),
            Err(VaultError::FileNotFound)
        ));
    }

    #[test]
    fn sharing_a_missing_or_malformed_id_is_denied() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        f.user("bob@example.com");

        for file_id in [uuid::Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            assert!(matches!(
                f.vault().share(&alice.id, &file_id, "bob@example.com"),
                Err(VaultError::AccessDenied)
            ));
        }
    }

    #[test]
    fn corrupted_ciphertext_is_an_integrity_failure() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let record = f.vault().store(&alice.id, b"precious", "p.txt").unwrap();

        let mut blob = f.content.read_blob(&record.location).unwrap();
        blob[14] ^= 0xff;
        f.content.write_blob(&record.location, &blob).unwrap();

        assert!(matches!(
            f.vault().retrieve(&alice.id, &record.id),
            Err(VaultError::IntegrityFailure(_))
        ));
    }

    #[test]
    fn missing_blob_is_an_integrity_failure() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let record = f.vault().store(&alice.id, b"gone", "g.txt").unwrap();
        f.content.delete_blob(&record.location).unwrap();

        assert!(matches!(
            f.vault().retrieve(&alice.id, &record.id),
            Err(VaultError::IntegrityFailure(_))
        ));
    }

    #[test]
    fn sharing_grants_read_and_lists_the_file() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let bob = f.user("bob@example.com");
        let record = f.vault().store(&alice.id, b"for bob", "b.txt").unwrap();

        f.vault().share(&alice.id, &record.id, "bob@example.com").unwrap();
        // Re-sharing is a no-op
        f.vault().share(&alice.id, &record.id, "bob@example.com").unwrap();

        let shared = f.vault().list_shared(&bob.id).unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, record.id);
        assert_eq!(shared[0].owner_user_id, alice.id);
        assert_eq!(f.vault().retrieve(&bob.id, &record.id).unwrap().bytes, b"for bob");

        // Grantees cannot delete or re-share
        assert!(matches!(
            f.vault().delete(&bob.id, &record.id),
            Err(VaultError::FileNotFound)
        ));
        assert!(matches!(
            f.vault().share(&bob.id, &record.id, "alice@example.com"),
            Err(VaultError::AccessDenied)
        ));
    }

    #[test]
    fn share_to_unknown_email_is_rejected() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let record = f.vault().store(&alice.id, b"x", "x.txt").unwrap();

        assert!(matches!(
            f.vault().share(&alice.id, &record.id, "nobody@example.com"),
            Err(VaultError::UserNotFound)
        ));
    }

    #[test]
    fn self_share_creates_no_grant() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let record = f.vault().store(&alice.id, b"x", "x.txt").unwrap();

        f.vault().share(&alice.id, &record.id, "alice@example.com").unwrap();
        assert!(f.vault().list_shared(&alice.id).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_file_drops_its_grants() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");
        let bob = f.user("bob@example.com");
        let record = f.vault().store(&alice.id, b"x", "x.txt").unwrap();
        f.vault().share(&alice.id, &record.id, "bob@example.com").unwrap();

        f.vault().delete(&alice.id, &record.id).unwrap();
        assert!(f.vault().list_shared(&bob.id).unwrap().is_empty());
        assert!(f.db.find_share(&record.id, &bob.id).unwrap().is_none());
    }

    #[test]
    fn listings_are_ordered_by_creation_time() {
        let f = Fixture::new();
        let alice = f.user("alice@example.com");

        let first = f.vault().store(&alice.id, b"1", "first.txt").unwrap();
        f.clock.advance(Duration::seconds(5));
        let second = f.vault().store(&alice.id, b"2", "second.txt").unwrap();

        let owned = f.vault().list_owned(&alice.id).unwrap();
        let ids: Vec<_> = owned.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }
}
