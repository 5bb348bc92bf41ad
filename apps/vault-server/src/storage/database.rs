// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded vault database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `user_emails`: email → user_id (the uniqueness constraint on email)
//! - `auth_codes`: composite key (len|code|len|device|code_id) → serialized OneTimeCode
//! - `sessions`: session token → serialized Session
//! - `files`: file_id → serialized FileRecord
//! - `shares`: share_id → serialized ShareGrant
//!
//! ## Units of Work
//!
//! Every mutation goes through a [`UnitOfWork`], which wraps exactly one redb
//! write transaction. Nothing it writes is visible until [`UnitOfWork::commit`];
//! dropping it uncommitted rolls every write back. redb admits one writer at a
//! time, so units of work are serialized against each other.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::records::{FileRecord, OneTimeCode, Session, ShareGrant, User};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized User (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: email → user_id.
const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// One-time codes under a composite key so a (code, device) pair is one range scan.
const AUTH_CODES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("auth_codes");

/// Sessions: bearer token → serialized Session.
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// File metadata: file_id → serialized FileRecord.
const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Share grants: share_id → serialized ShareGrant.
const SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("shares");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error("session token collision")]
    DuplicateToken,

    #[error("not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Rows removed by an expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub codes: usize,
    pub sessions: usize,
}

// =============================================================================
// Key & Row Helpers
// =============================================================================

/// Length-prefixed `code` + `device_id`. No two distinct pairs share a prefix,
/// so a range scan from here visits exactly the rows for this pair.
fn code_prefix(code: &str, device_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + code.len() + device_id.len());
    key.extend_from_slice(&(code.len() as u32).to_be_bytes());
    key.extend_from_slice(code.as_bytes());
    key.extend_from_slice(&(device_id.len() as u32).to_be_bytes());
    key.extend_from_slice(device_id.as_bytes());
    key
}

fn code_key(code: &OneTimeCode) -> Vec<u8> {
    let mut key = code_prefix(&code.code, &code.device_id);
    key.extend_from_slice(code.id.as_bytes());
    key
}

fn get_row<T, Tab>(table: &Tab, key: &str) -> DbResult<Option<T>>
where
    T: DeserializeOwned,
    Tab: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn scan_rows<T, Tab>(table: &Tab) -> DbResult<Vec<T>>
where
    T: DeserializeOwned,
    Tab: ReadableTable<&'static str, &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

fn put_row<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &str,
    row: &T,
) -> DbResult<()> {
    let json = serde_json::to_vec(row)?;
    table.insert(key, json.as_slice())?;
    Ok(())
}

fn find_user_id<Tab>(emails: &Tab, email: &str) -> DbResult<Option<String>>
where
    Tab: ReadableTable<&'static str, &'static str>,
{
    Ok(emails.get(email)?.map(|id| id.value().to_string()))
}

// =============================================================================
// VaultDb
// =============================================================================

/// Embedded ACID store for identities, sessions, file metadata and shares.
pub struct VaultDb {
    db: Database,
}

impl VaultDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(AUTH_CODES)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(SHARES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Start a unit of work. Commit it, or drop it to roll back.
    pub fn begin(&self) -> DbResult<UnitOfWork> {
        Ok(UnitOfWork {
            txn: self.db.begin_write()?,
        })
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    // =========================================================================
    // Read-only lookups
    // =========================================================================

    pub fn get_user(&self, user_id: &str) -> DbResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        get_row(&users, user_id)
    }

    pub fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let Some(user_id) = find_user_id(&emails, email)? else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        get_row(&users, &user_id)
    }

    /// Look up a session by token, ignoring it once `expires_at` has passed.
    pub fn find_live_session(&self, token: &str, now: DateTime<Utc>) -> DbResult<Option<Session>> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(SESSIONS)?;
        let session: Option<Session> = get_row(&sessions, token)?;
        Ok(session.filter(|s| s.is_live(now)))
    }

    pub fn get_file(&self, file_id: &str) -> DbResult<Option<FileRecord>> {
        let read_txn = self.db.begin_read()?;
        let files = read_txn.open_table(FILES)?;
        get_row(&files, file_id)
    }

    pub fn list_files_by_owner(&self, owner_user_id: &str) -> DbResult<Vec<FileRecord>> {
        let read_txn = self.db.begin_read()?;
        let files = read_txn.open_table(FILES)?;
        let all: Vec<FileRecord> = scan_rows(&files)?;
        Ok(all
            .into_iter()
            .filter(|f| f.owner_user_id == owner_user_id)
            .collect())
    }

    /// Grants held by a user, each joined with the file it points at.
    ///
    /// Grants whose file no longer exists are skipped.
    pub fn list_shared_with(&self, user_id: &str) -> DbResult<Vec<(ShareGrant, FileRecord)>> {
        let read_txn = self.db.begin_read()?;
        let shares = read_txn.open_table(SHARES)?;
        let files = read_txn.open_table(FILES)?;

        let grants: Vec<ShareGrant> = scan_rows(&shares)?;
        let mut joined = Vec::new();
        for grant in grants.into_iter().filter(|g| g.shared_user_id == user_id) {
            if let Some(file) = get_row::<FileRecord, _>(&files, &grant.file_id)? {
                joined.push((grant, file));
            }
        }
        Ok(joined)
    }

    pub fn find_share(&self, file_id: &str, user_id: &str) -> DbResult<Option<ShareGrant>> {
        let read_txn = self.db.begin_read()?;
        let shares = read_txn.open_table(SHARES)?;
        let grants: Vec<ShareGrant> = scan_rows(&shares)?;
        Ok(grants
            .into_iter()
            .find(|g| g.file_id == file_id && g.shared_user_id == user_id))
    }

    /// Delete every code and session whose expiry is at or before `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<PurgeCounts> {
        let uow = self.begin()?;
        let counts = uow.purge_expired(now)?;
        uow.commit()?;
        Ok(counts)
    }
}

// =============================================================================
// UnitOfWork
// =============================================================================

/// One atomic group of reads and writes against the vault database.
pub struct UnitOfWork {
    txn: WriteTransaction,
}

impl UnitOfWork {
    /// Make every write of this unit visible at once.
    pub fn commit(self) -> DbResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn get_user(&self, user_id: &str) -> DbResult<Option<User>> {
        let users = self.txn.open_table(USERS)?;
        get_row(&users, user_id)
    }

    pub fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user_id = {
            let emails = self.txn.open_table(USER_EMAILS)?;
            find_user_id(&emails, email)?
        };
        match user_id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    /// Insert a new user, failing with `DuplicateEmail` if the email is taken.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        {
            let mut emails = self.txn.open_table(USER_EMAILS)?;
            if emails.get(user.email.as_str())?.is_some() {
                return Err(DbError::DuplicateEmail(user.email.clone()));
            }
            emails.insert(user.email.as_str(), user.id.as_str())?;
        }
        let mut users = self.txn.open_table(USERS)?;
        put_row(&mut users, &user.id, user)
    }

    /// Overwrite an existing user row (tier flag, storage counter).
    pub fn update_user(&self, user: &User) -> DbResult<()> {
        let mut users = self.txn.open_table(USERS)?;
        if users.get(user.id.as_str())?.is_none() {
            return Err(DbError::NotFound(format!("User {}", user.id)));
        }
        put_row(&mut users, &user.id, user)
    }

    // =========================================================================
    // One-time codes
    // =========================================================================

    pub fn insert_code(&self, code: &OneTimeCode) -> DbResult<()> {
        let json = serde_json::to_vec(code)?;
        let key = code_key(code);
        let mut codes = self.txn.open_table(AUTH_CODES)?;
        codes.insert(key.as_slice(), json.as_slice())?;
        Ok(())
    }

    /// First unexpired code row matching `(code, device_id)` exactly.
    pub fn find_live_code(
        &self,
        code: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<OneTimeCode>> {
        let prefix = code_prefix(code, device_id);
        let codes = self.txn.open_table(AUTH_CODES)?;
        for entry in codes.range(prefix.as_slice()..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let row: OneTimeCode = serde_json::from_slice(value.value())?;
            if row.is_live(now) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Remove every code row for `(code, device_id)`, expired or not.
    pub fn delete_codes(&self, code: &str, device_id: &str) -> DbResult<usize> {
        let prefix = code_prefix(code, device_id);
        let mut codes = self.txn.open_table(AUTH_CODES)?;

        let mut keys = Vec::new();
        for entry in codes.range(prefix.as_slice()..)? {
            let (key, _) = entry?;
            let key = key.value();
            if !key.starts_with(&prefix) {
                break;
            }
            keys.push(key.to_vec());
        }

        for key in &keys {
            codes.remove(key.as_slice())?;
        }
        Ok(keys.len())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn insert_session(&self, session: &Session) -> DbResult<()> {
        let mut sessions = self.txn.open_table(SESSIONS)?;
        if sessions.get(session.token.as_str())?.is_some() {
            return Err(DbError::DuplicateToken);
        }
        put_row(&mut sessions, &session.token, session)
    }

    /// Returns whether a row was removed.
    pub fn delete_session(&self, token: &str) -> DbResult<bool> {
        let mut sessions = self.txn.open_table(SESSIONS)?;
        let removed = sessions.remove(token)?.is_some();
        Ok(removed)
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub fn insert_file(&self, file: &FileRecord) -> DbResult<()> {
        let mut files = self.txn.open_table(FILES)?;
        put_row(&mut files, &file.id, file)
    }

    pub fn get_file(&self, file_id: &str) -> DbResult<Option<FileRecord>> {
        let files = self.txn.open_table(FILES)?;
        get_row(&files, file_id)
    }

    /// Remove a file row, returning what was removed.
    pub fn remove_file(&self, file_id: &str) -> DbResult<Option<FileRecord>> {
        let mut files = self.txn.open_table(FILES)?;
        let removed = files.remove(file_id)?.map(|row| row.value().to_vec());
        match removed {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Shares
    // =========================================================================

    pub fn insert_share(&self, grant: &ShareGrant) -> DbResult<()> {
        let mut shares = self.txn.open_table(SHARES)?;
        put_row(&mut shares, &grant.id, grant)
    }

    pub fn find_share(&self, file_id: &str, user_id: &str) -> DbResult<Option<ShareGrant>> {
        let shares = self.txn.open_table(SHARES)?;
        let grants: Vec<ShareGrant> = scan_rows(&shares)?;
        Ok(grants
            .into_iter()
            .find(|g| g.file_id == file_id && g.shared_user_id == user_id))
    }

    /// Drop every grant pointing at a file.
    pub fn remove_shares_for_file(&self, file_id: &str) -> DbResult<usize> {
        let mut shares = self.txn.open_table(SHARES)?;
        let grants: Vec<ShareGrant> = scan_rows(&shares)?;
        let doomed: Vec<String> = grants
            .into_iter()
            .filter(|g| g.file_id == file_id)
            .map(|g| g.id)
            .collect();

        for id in &doomed {
            shares.remove(id.as_str())?;
        }
        Ok(doomed.len())
    }

    // =========================================================================
    // Reclamation
    // =========================================================================

    pub fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<PurgeCounts> {
        let mut counts = PurgeCounts::default();

        {
            let mut codes = self.txn.open_table(AUTH_CODES)?;
            let mut expired = Vec::new();
            for entry in codes.iter()? {
                let (key, value) = entry?;
                let row: OneTimeCode = serde_json::from_slice(value.value())?;
                if !row.is_live(now) {
                    expired.push(key.value().to_vec());
                }
            }
            for key in &expired {
                codes.remove(key.as_slice())?;
            }
            counts.codes = expired.len();
        }

        let mut sessions = self.txn.open_table(SESSIONS)?;
        let rows: Vec<Session> = scan_rows(&sessions)?;
        let expired: Vec<String> = rows
            .into_iter()
            .filter(|s| !s.is_live(now))
            .map(|s| s.token)
            .collect();
        for token in &expired {
            sessions.remove(token.as_str())?;
        }
        counts.sessions = expired.len();

        Ok(counts)
    }
}

// =============================================================================
// Tests
// =============================================================================
