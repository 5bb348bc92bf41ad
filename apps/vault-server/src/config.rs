// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a
//! [`VaultConfig`] and handed to constructors by value.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the database and ciphertext blobs | `./data` |
//! | `FILE_ENCRYPTION_KEY` | Base64-encoded 32-byte AES-256 key | Required |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `MAX_UPLOAD_BYTES` | Largest accepted upload body, in bytes | `1073741824` (1 GiB) |
//! | `SWEEP_INTERVAL_SECS` | Seconds between expired code/session sweeps (`0` disables) | Disabled |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use base64ct::{Base64, Encoding};

use crate::storage::cipher::KEY_LEN;
use crate::storage::paths::DATA_ROOT;

pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable holding the file encryption key.
///
/// Standard base64 with padding. The decoded key must be exactly 32 bytes.
pub const FILE_ENCRYPTION_KEY_ENV: &str = "FILE_ENCRYPTION_KEY";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("FILE_ENCRYPTION_KEY is not valid base64")]
    KeyEncoding,

    #[error("FILE_ENCRYPTION_KEY must decode to 32 bytes, got {0}")]
    KeyLength(usize),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Process configuration for the vault server.
#[derive(Clone)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    encryption_key: [u8; KEY_LEN],
    pub host: String,
    pub port: u16,
    /// Request bodies above this size are refused before they are buffered.
    pub max_upload_bytes: usize,
    /// `None` disables the background expiry sweeper.
    pub sweep_interval: Option<Duration>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("data_dir", &self.data_dir)
            .field("encryption_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("sweep_interval", &self.sweep_interval)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl VaultConfig {
    /// Defaults for everything except the data root and key.
    pub fn new(data_dir: impl Into<PathBuf>, encryption_key: [u8; KEY_LEN]) -> Self {
        Self {
            data_dir: data_dir.into(),
            encryption_key,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sweep_interval: None,
            log_format: LogFormat::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_key = lookup(FILE_ENCRYPTION_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(FILE_ENCRYPTION_KEY_ENV))?;
        let encryption_key = decode_key(raw_key.trim())?;

        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DATA_ROOT.to_string());

        let host = lookup(HOST_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match lookup(MAX_UPLOAD_BYTES_ENV) {
            Some(value) => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: MAX_UPLOAD_BYTES_ENV,
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let sweep_interval = match lookup(SWEEP_INTERVAL_ENV) {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    name: SWEEP_INTERVAL_ENV,
                    value,
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | Some("") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            encryption_key,
            host,
            port,
            max_upload_bytes,
            sweep_interval,
            log_format,
        })
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue {
            name: HOST_ENV,
            value: addr,
        })
    }
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN], ConfigError> {
    let bytes = Base64::decode_vec(encoded).map_err(|_| ConfigError::KeyEncoding)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ConfigError::KeyLength(len))
}
