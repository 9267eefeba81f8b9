// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod kv;
pub mod ola;
pub mod otp;

pub use kv::{KvStore, SharedKv};
pub use ola::{OlaClient, RideQuote, RideQuoteService};
pub use otp::OtpService;
