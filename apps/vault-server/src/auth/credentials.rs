// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generation of one-time codes and session tokens.
//!
//! Both draw from the operating system CSPRNG via `ring`. Session tokens are
//! never derived from a code or from anything user-visible.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};

/// Number of letters in a one-time code.
pub const CODE_LEN: usize = 6;

/// Random bytes behind each session token (256 bits).
const TOKEN_BYTES: usize = 32;

const CODE_ALPHABET: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are discarded so every letter is equally likely.
const REJECTION_BOUND: u8 = (256 / CODE_ALPHABET.len() * CODE_ALPHABET.len()) as u8;

#[derive(Debug, thiserror::Error)]
#[error("system random source failed")]
pub struct RandomError;

/// A fresh 6-letter code over `[A-Za-z]`.
pub fn generate_code() -> Result<String, RandomError> {
    let rng = SystemRandom::new();
    let mut code = String::with_capacity(CODE_LEN);
    let mut buf = [0u8; 16];

    while code.len() < CODE_LEN {
        rng.fill(&mut buf).map_err(|_| RandomError)?;
        for &byte in buf.iter().filter(|&&b| b < REJECTION_BOUND) {
            code.push(CODE_ALPHABET[byte as usize % CODE_ALPHABET.len()] as char);
            if code.len() == CODE_LEN {
                break;
            }
        }
    }

    Ok(code)
}

/// A fresh opaque bearer token: 32 random bytes, URL-safe base64 without padding.
pub fn generate_session_token() -> Result<String, RandomError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| RandomError)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
