#![doc(test(attr(deny(warnings))))]

//! Booking Core is the financial state machine behind appointment booking:
//! authorizations, captures, policy fees, refunds, gift card balances, and the
//! analytics derived from them.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod storage;
pub mod utils;

use std::borrow::Borrow;

pub use crate::config::EngineConfig;
pub use crate::core::services::{AnalyticsSnapshot, BookingAction, BookingSeed};
pub use crate::core::{ActionResponse, BookingEngine};
pub use crate::domain::{Booking, Customer};
pub use crate::errors::{BookingError, Result};

/// Initializes global tracing and emits a startup info log. Safe to call repeatedly.
pub fn init() {
    utils::init_tracing();
}

/// Folds any booking collection into a fresh analytics snapshot.
pub fn recompute_analytics<B: Borrow<Booking>>(bookings: &[B]) -> AnalyticsSnapshot {
    crate::core::services::AnalyticsService::recompute(bookings)
}

/// Distinct customers in first-seen order.
pub fn derive_customers<B: Borrow<Booking>>(bookings: &[B]) -> Vec<Customer> {
    crate::core::services::CustomerService::derive_customers(bookings)
}
