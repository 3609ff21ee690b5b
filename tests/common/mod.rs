#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use booking_core::{
    config::EngineConfig,
    core::{BookingEngine, FixedClock},
    domain::{Catalog, CustomerContact, GiftCardProgram, PolicyConsent, Service, StaffMember},
    money::FeePolicy,
    BookingSeed,
};
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn slot(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now()))
}

/// `cut` 60 min at 100.00, `color` 120 min at 140.00, `consult` 30 min free.
pub fn catalog() -> Catalog {
    Catalog::new(
        vec![
            Service::new("cut", "Haircut", "Hair", 60, 10_000),
            Service::new("color", "Color", "Hair", 120, 14_000),
            Service::new("consult", "Consultation", "General", 30, 0),
        ],
        vec![
            StaffMember::new("sam", "Sam Rivera", "#336699"),
            StaffMember::new("ria", "Ria Chen", "#993366"),
        ],
    )
}

/// No-show 50%, cancellation 25.00 flat, stored-value gift cards with `WELCOME` known.
pub fn config() -> EngineConfig {
    let mut config = EngineConfig::new("glow-studio");
    config.policies.no_show = FeePolicy::percent(50.0);
    config.policies.cancellation = FeePolicy::flat(25.0);
    config.gift_cards = GiftCardProgram {
        enabled: true,
        codes: vec!["WELCOME".into()],
        ..GiftCardProgram::default()
    };
    config.pay_link_base_url = "https://pay.example.com/b".into();
    config
}

pub fn engine() -> BookingEngine {
    engine_with(config())
}

pub fn engine_with(config: EngineConfig) -> BookingEngine {
    BookingEngine::with_catalog(config, catalog(), clock()).expect("engine")
}

pub fn seed(service: &str, email: &str) -> BookingSeed {
    BookingSeed::new(
        service,
        slot(10, 10),
        CustomerContact::new("Ada Lovelace").with_email(email),
        PolicyConsent::new("sha256:policies-v1", now()),
    )
}
