//! Append-only ledgers: booking payments and gift card balances.

pub mod gift_cards;
pub mod payments;

pub use gift_cards::{GiftCardLedger, GiftCardMovement};
