// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Vault - Encrypted Multi-Tenant File Vault
//!
//! Users log in with a one-time code bound to a device, receive an opaque
//! session token, and store files that are encrypted at rest, counted
//! against a per-user quota, and shareable read-only with other users.
//!
//! ## Modules
//!
//! - `vault` - Authentication lifecycle and file storage engine
//! - `storage` - redb relational store, ciphertext blob store, cipher
//! - `auth` - Bearer token extraction and credential generation
//! - `api` - HTTP API handlers (Axum)
//! - `sweeper` - Background reclamation of expired codes and sessions

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod sweeper;
pub mod vault;
