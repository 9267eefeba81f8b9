// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time passcode issuance and verification.
//!
//! Codes are six random digits. Only an HMAC-SHA256 digest of
//! `user_id:code` is kept in the KV store, under `otp:{user_id}`, so a
//! dump of the store does not reveal live codes. Issuing a new code
//! overwrites the previous one for that user.

use crate::error::AppError;
use crate::services::kv::SharedKv;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Number of digits in an issued code.
pub const OTP_DIGITS: usize = 6;

const OTP_MODULUS: u32 = 1_000_000;
/// Largest multiple of `OTP_MODULUS` that fits in a u32; samples at or
/// above it are redrawn so every code is equally likely.
const OTP_SAMPLE_LIMIT: u32 = (u32::MAX / OTP_MODULUS) * OTP_MODULUS;

/// OTP service backed by the shared KV store.
#[derive(Clone)]
pub struct OtpService {
    kv: SharedKv,
    rng: SystemRandom,
    hash_key: Vec<u8>,
    ttl: Duration,
    single_use: bool,
}

impl OtpService {
    pub fn new(kv: SharedKv, hash_key: Vec<u8>, ttl: Duration, single_use: bool) -> Self {
        Self {
            kv,
            rng: SystemRandom::new(),
            hash_key,
            ttl,
            single_use,
        }
    }

    fn key(user_id: &str) -> String {
        format!("otp:{}", user_id)
    }

    /// Generate and store a fresh code for `user_id`, replacing any pending one.
    ///
    /// The code is returned for the delivery channel; it must not be sent
    /// back in an API response.
    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        let code = self.generate_code()?;
        let digest = self.digest(user_id, &code)?;
        self.kv.put(Self::key(user_id), digest, self.ttl);

        tracing::debug!(user_id, ttl_secs = self.ttl.as_secs(), "OTP issued");
        Ok(code)
    }

    /// Check `submitted` against the pending code for `user_id`.
    ///
    /// Unless single-use mode is enabled the code stays valid until its TTL
    /// elapses, so it can be verified more than once.
    pub fn verify(&self, user_id: &str, submitted: &str) -> Result<(), AppError> {
        let key = Self::key(user_id);
        let stored = self.kv.get(&key).ok_or(AppError::OtpExpired)?;

        let candidate = self.digest(user_id, submitted.trim())?;
        if !bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())) {
            tracing::info!(user_id, "OTP mismatch");
            return Err(AppError::OtpMismatch);
        }

        if self.single_use {
            self.kv.delete(&key);
        }

        Ok(())
    }

    fn generate_code(&self) -> Result<String, AppError> {
        let mut buf = [0u8; 4];
        loop {
            self.rng
                .fill(&mut buf)
                .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
            let sample = u32::from_be_bytes(buf);
            if sample < OTP_SAMPLE_LIMIT {
                return Ok(format!(
                    "{:0width$}",
                    sample % OTP_MODULUS,
                    width = OTP_DIGITS
                ));
            }
        }
    }

    fn digest(&self, user_id: &str, code: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.hash_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(user_id.as_bytes());
        mac.update(b":");
        mac.update(code.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
