// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod ride;
pub mod user;

pub use ride::{RideCoordinates, RideEstimate, RideFingerprint, ServiceType};
pub use user::{Provider, User};
