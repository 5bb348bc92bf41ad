// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk vault layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent vault state.
pub const DATA_ROOT: &str = "./data";

/// File name of the embedded relational store under the data root.
const DATABASE_FILE: &str = "vault.redb";

/// Storage path utilities for the vault data root.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all vault data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb database holding users, codes, sessions, files and shares.
    pub fn database_file(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    // ========== Content Store Paths ==========

    /// Directory containing all ciphertext blobs.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Path to the ciphertext blob addressed by a location handle.
    pub fn blob(&self, handle: &str) -> PathBuf {
        self.blobs_dir().join(format!("{handle}.bin"))
    }
}
