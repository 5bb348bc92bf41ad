// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for the vault, split in two:
//!
//! - a **relational store** (`database`) holding users, one-time codes,
//!   sessions, file metadata and share grants in redb, mutated only through
//!   atomic units of work;
//! - a **content store** (`content_store`) holding ciphertext blobs on the
//!   filesystem, addressed by opaque location handles.
//!
//! ## Storage Layout
//!
//! ```text
//! <DATA_DIR>/
//!   vault.redb          # relational store
//!   blobs/
//!     {handle}.bin      # nonce || AES-256-GCM ciphertext
//! ```
//!
//! Plaintext never touches the disk; `cipher` seals it before it reaches
//! the content store.

pub mod cipher;
pub mod content_store;
pub mod database;
pub mod paths;
pub mod records;

pub use cipher::{AeadCipher, Cipher, CipherError};
pub use content_store::{ContentStore, StorageError, StorageResult};
pub use database::{DbError, DbResult, PurgeCounts, UnitOfWork, VaultDb};
pub use paths::StoragePaths;
pub use records::{FileRecord, OneTimeCode, Session, SessionData, ShareGrant, SharePermission, User};
