// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Core
//!
//! Authentication lifecycle and file storage engine, independent of HTTP.
//!
//! ## Components
//!
//! - [`identity`]: user accounts and one-time code issuance
//! - [`session`]: code verification, session issuance, resolution, revocation
//! - [`quota`]: per-user storage accounting and the free-tier ceiling
//! - [`access`]: ownership and read-grant decisions
//! - [`files`]: encrypted store, retrieve, list, delete and share
//!
//! [`Vault`] ties them together behind the operations exposed to clients.
//! Every operation except code requests and verification takes an
//! [`AuthenticatedSession`], which only [`Vault::authenticate`] produces.
//!
//! The database is the only shared mutable state. Each operation runs as
//! one or more independent units of work against it.

pub mod access;
pub mod clock;
pub mod error;
pub mod files;
pub mod identity;
pub mod quota;
pub mod session;

use std::sync::Arc;

use crate::auth::credentials::generate_code;
use crate::config::VaultConfig;
use crate::storage::{AeadCipher, Cipher, ContentStore, PurgeCounts, StoragePaths, VaultDb};

pub use access::AccessControl;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{VaultError, VaultResult};
pub use files::{FileVault, OwnedFile, RetrievedFile, SharedFile};
pub use identity::IdentityStore;
pub use quota::FREE_TIER_LIMIT_BYTES;
pub use session::{AuthenticatedSession, SessionAuthority};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: String,
    pub checksum: String,
}

/// Both halves of a user's file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub owned: Vec<OwnedFile>,
    pub shared: Vec<SharedFile>,
}

/// Storage usage snapshot for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    pub current_storage_bytes: u64,
    pub is_paid: bool,
}

pub struct Vault {
    db: VaultDb,
    content: ContentStore,
    cipher: Box<dyn Cipher>,
    clock: Arc<dyn Clock>,
}

impl Vault {
    pub fn new(
        db: VaultDb,
        content: ContentStore,
        cipher: Box<dyn Cipher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            content,
            cipher,
            clock,
        }
    }

    /// Open the database and content store under the configured data root.
    pub fn open(config: &VaultConfig) -> VaultResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &VaultConfig, clock: Arc<dyn Clock>) -> VaultResult<Self> {
        let paths = StoragePaths::new(&config.data_dir);
        let db = VaultDb::open(&paths.database_file())?;

        let mut content = ContentStore::new(paths);
        content
            .initialize()
            .map_err(|e| VaultError::Internal(format!("content store: {e}")))?;

        let cipher = AeadCipher::new(config.encryption_key())
            .map_err(|e| VaultError::Internal(e.to_string()))?;

        tracing::info!(data_dir = %config.data_dir.display(), "Vault opened");
        Ok(Self::new(db, content, Box::new(cipher), clock))
    }

    pub fn database(&self) -> &VaultDb {
        &self.db
    }

    fn identity(&self) -> IdentityStore<'_> {
        IdentityStore::new(&self.db)
    }

    fn sessions(&self) -> SessionAuthority<'_> {
        SessionAuthority::new(&self.db, self.clock.as_ref())
    }

    fn files(&self) -> FileVault<'_> {
        FileVault::new(&self.db, &self.content, self.cipher.as_ref(), self.clock.as_ref())
    }

    pub fn access(&self) -> AccessControl<'_> {
        AccessControl::new(&self.db)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Issue a one-time code for `email` on `device_id`, registering the
    /// email on first use. The code is returned to the caller directly.
    pub fn request_code(&self, email: &str, device_id: &str) -> VaultResult<String> {
        let code = generate_code().map_err(|e| VaultError::Internal(e.to_string()))?;

        match self.issue_code(email, device_id, &code) {
            // A concurrent request created the account first; it is there now.
            Err(VaultError::DuplicateIdentity(_)) => self.issue_code(email, device_id, &code)?,
            other => other?,
        }
        Ok(code)
    }

    fn issue_code(&self, email: &str, device_id: &str, code: &str) -> VaultResult<()> {
        let now = self.clock.now();
        let identity = self.identity();

        let uow = self.db.begin()?;
        let user = identity.get_or_create_user(&uow, email, now)?;
        identity.issue_one_time_code(&uow, &user, device_id, code, now)?;
        uow.commit()?;
        Ok(())
    }

    /// Exchange a live code for a session token.
    pub fn verify_code(&self, code: &str, device_id: &str) -> VaultResult<String> {
        self.sessions().verify_and_issue_session(code, device_id)
    }

    /// Resolve a bearer token. Every other operation requires the result.
    pub fn authenticate(&self, token: &str) -> VaultResult<AuthenticatedSession> {
        self.sessions().resolve_session(token)
    }

    pub fn logout(&self, session: &AuthenticatedSession) -> VaultResult<()> {
        self.sessions().revoke_session(session)
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub fn upload(
        &self,
        session: &AuthenticatedSession,
        bytes: &[u8],
        file_name: &str,
    ) -> VaultResult<UploadReceipt> {
        let record = self.files().store(session.user_id(), bytes, file_name)?;
        Ok(UploadReceipt {
            file_id: record.id,
            checksum: record.checksum,
        })
    }

    pub fn download(
        &self,
        session: &AuthenticatedSession,
        file_id: &str,
    ) -> VaultResult<RetrievedFile> {
        self.files().retrieve(session.user_id(), file_id)
    }

    pub fn list_files(&self, session: &AuthenticatedSession) -> VaultResult<FileListing> {
        let files = self.files();
        Ok(FileListing {
            owned: files.list_owned(session.user_id())?,
            shared: files.list_shared(session.user_id())?,
        })
    }

    pub fn delete_file(&self, session: &AuthenticatedSession, file_id: &str) -> VaultResult<()> {
        self.files().delete(session.user_id(), file_id)
    }

    pub fn share_file(
        &self,
        session: &AuthenticatedSession,
        file_id: &str,
        grantee_email: &str,
    ) -> VaultResult<()> {
        self.files().share(session.user_id(), file_id, grantee_email)
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub fn storage_status(&self, session: &AuthenticatedSession) -> VaultResult<StorageStatus> {
        let user = self.identity().get_user(session.user_id())?;
        Ok(StorageStatus {
            current_storage_bytes: user.current_storage,
            is_paid: user.is_paid,
        })
    }

    /// Bytes the caller may still upload; `None` for paid accounts.
    pub fn upload_headroom(&self, session: &AuthenticatedSession) -> VaultResult<Option<u64>> {
        let user = self.identity().get_user(session.user_id())?;
        Ok(quota::headroom(&user))
    }

    /// Move the caller to the paid tier. No payment is taken.
    pub fn upgrade(&self, session: &AuthenticatedSession) -> VaultResult<()> {
        let uow = self.db.begin()?;
        let user = quota::upgrade_to_paid(&uow, session.user_id())?;
        uow.commit()?;
        tracing::info!(user_id = %user.id, "Upgraded account to paid tier");
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Delete codes and sessions that have expired as of now.
    pub fn purge_expired(&self) -> VaultResult<PurgeCounts> {
        Ok(self.db.purge_expired(self.clock.now())?)
    }

    pub fn health_check(&self) -> VaultResult<()> {
        self.db.health_check()?;
        self.content
            .health_check()
            .map_err(|e| VaultError::Internal(e.to_string()))
    }
}
