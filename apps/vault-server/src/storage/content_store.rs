// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ciphertext blob storage on the local filesystem.
//!
//! Blobs are addressed by an opaque location handle and only ever hold
//! ciphertext; encryption happens in the vault before bytes reach this
//! module. Writes land in a temp file and are renamed into place, so a
//! reader never observes a half-written blob.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};

use super::StoragePaths;

/// Error type for content store operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// Blob not found for the given handle
    NotFound(String),
    /// Storage not initialized
    NotInitialized,
    /// Read-back did not match what was written
    IntegrityViolation(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::NotFound(handle) => write!(f, "Blob not found: {handle}"),
            StorageError::NotInitialized => write!(f, "Content store not initialized"),
            StorageError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for content store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Filesystem-backed blob store rooted at `<data root>/blobs`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    paths: StoragePaths,
    initialized: bool,
}

impl ContentStore {
    /// Create a new ContentStore instance.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Create the blob directory. Safe to call multiple times.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.blobs_dir())?;
        self.initialized = true;
        Ok(())
    }

    /// Write-read-delete probe against the blob directory.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let probe = self.paths.blobs_dir().join(".health_check");
        let probe_data = b"health_check_data";

        fs::write(&probe, probe_data)?;
        let read_back = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if read_back != probe_data {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    /// Store a blob under `handle` (atomic write via rename).
    pub fn write_blob(&self, handle: &str, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = self.paths.blob(handle);
        let temp_path = path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Read the full blob stored under `handle`.
    pub fn read_blob(&self, handle: &str) -> StorageResult<Vec<u8>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let mut file = match File::open(self.paths.blob(handle)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(handle.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Remove the blob stored under `handle`.
    pub fn delete_blob(&self, handle: &str) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        match fs::remove_file(self.paths.blob(handle)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub fn exists(&self, handle: &str) -> bool {
        File::open(self.paths.blob(handle)).is_ok()
    }
}
