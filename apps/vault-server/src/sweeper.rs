// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expiry Sweeper
//!
//! Background task that periodically deletes expired one-time codes and
//! sessions. Request paths never clean up after themselves; expired rows are
//! already invisible to lookups, and this task only reclaims their space.
//!
//! Enabled by setting `SWEEP_INTERVAL_SECS` to a positive value.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::vault::Vault;

/// Background sweeper over the vault's expired codes and sessions.
pub struct ExpirySweeper {
    vault: Arc<Vault>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(vault: Arc<Vault>, interval: Duration) -> Self {
        Self { vault, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }

            self.sweep_step();
        }
    }

    /// Execute one sweep.
    fn sweep_step(&self) {
        match self.vault.purge_expired() {
            Ok(counts) if counts.codes > 0 || counts.sessions > 0 => {
                info!(
                    codes = counts.codes,
                    sessions = counts.sessions,
                    "Purged expired credentials"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::vault::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let vault = Arc::new(
            Vault::open_with_clock(&VaultConfig::new(dir.path(), [8u8; 32]), clock.clone())
                .unwrap(),
        );

        vault.request_code("alice@example.com", "phone").unwrap();
        clock.advance(chrono::Duration::minutes(11));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            ExpirySweeper::new(vault.clone(), Duration::from_millis(10)).run(shutdown.clone()),
        );

        // Paused time auto-advances through the sweeper's ticks
        tokio::time::sleep(Duration::from_millis(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let counts = vault.purge_expired().unwrap();
        assert_eq!(counts.codes, 0, "sweeper should already have purged the code");
    }

    #[tokio::test]
    async fn cancelled_sweeper_exits_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(Vault::open(&VaultConfig::new(dir.path(), [8u8; 32])).unwrap());

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        tokio::time::timeout(
            Duration::from_secs(1),
            ExpirySweeper::new(vault, Duration::from_secs(3600)).run(shutdown),
        )
        .await
        .expect("sweeper should stop on cancellation");
    }
}
