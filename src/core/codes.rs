//! Human-readable booking codes: `PREFIX-YEAR-SEQUENCE`, e.g. `GLO-2026-0042`.
//!
//! The sequence is a monotonic counter owned by the store, so two bookings never
//! share a code regardless of volume.

use std::sync::atomic::{AtomicU64, Ordering};

const PREFIX_LEN: usize = 3;
const PREFIX_PAD: char = 'X';

/// First three ASCII letters of the business slug, uppercased and padded with `X`.
pub fn prefix_for(slug: &str) -> String {
    let mut prefix: String = slug
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .take(PREFIX_LEN)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    while prefix.len() < PREFIX_LEN {
        prefix.push(PREFIX_PAD);
    }
    prefix
}

pub fn format_code(prefix: &str, year: i32, sequence: u64) -> String {
    format!("{prefix}-{year}-{sequence:04}")
}

/// Extracts the sequence number from a code produced by [`format_code`].
pub fn parse_sequence(code: &str) -> Option<u64> {
    code.rsplit('-').next()?.parse().ok()
}

#[derive(Debug)]
pub struct BookingCodeGenerator {
    next: AtomicU64,
}

impl BookingCodeGenerator {
    pub fn starting_at(next: u64) -> Self {
        Self {
            next: AtomicU64::new(next.max(1)),
        }
    }

    /// Resumes after the highest sequence found among existing codes.
    pub fn resume_after<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let highest = codes.into_iter().filter_map(parse_sequence).max().unwrap_or(0);
        Self::starting_at(highest + 1)
    }

    pub fn next_code(&self, slug: &str, year: i32) -> String {
        let sequence = self.next.fetch_add(1, Ordering::SeqCst);
        format_code(&prefix_for(slug), year, sequence)
    }

    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for BookingCodeGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
