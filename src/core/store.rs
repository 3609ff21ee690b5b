//! Committed booking snapshots and the locks that serialize writers.
//!
//! Writers take the per-booking slot (then the per-code slot when the gift card
//! ledger is involved), read the committed snapshot, and commit a replacement.
//! Readers clone `Arc`s of committed snapshots and never observe a half-applied
//! action.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::core::codes::BookingCodeGenerator;
use crate::domain::{gift_card::normalize_code, Booking, GiftCardLedgerEntry};
use crate::errors::{BookingError, Result};
use crate::ledger::GiftCardLedger;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(rw: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(rw: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lazily created mutual-exclusion slots keyed by booking id or gift card code.
///
/// Slots are never evicted. Bookings and gift card codes are never deleted, so the
/// table stays bounded by the booking count plus the gift code count.
#[derive(Debug)]
pub struct LockTable<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        lock(&self.slots)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl<K: Eq + Hash + Clone> Default for LockTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct BookingIndex {
    order: Vec<Uuid>,
    by_id: HashMap<Uuid, Arc<Booking>>,
}

/// Everything a store holds, as plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub bookings: Vec<Booking>,
    pub gift_card_entries: Vec<GiftCardLedgerEntry>,
    pub next_sequence: u64,
}

#[derive(Debug)]
pub struct BookingStore {
    bookings: RwLock<BookingIndex>,
    gift_cards: RwLock<GiftCardLedger>,
    booking_locks: LockTable<Uuid>,
    gift_card_locks: LockTable<String>,
    intake: Mutex<()>,
    codes: BookingCodeGenerator,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }

    /// Rebuilds a store; the code sequence never falls behind existing codes.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let resumed =
            BookingCodeGenerator::resume_after(snapshot.bookings.iter().map(|b| b.code.as_str()));
        let codes = BookingCodeGenerator::starting_at(resumed.peek().max(snapshot.next_sequence));
        let mut index = BookingIndex::default();
        for booking in snapshot.bookings {
            if index.by_id.contains_key(&booking.id) {
                continue;
            }
            index.order.push(booking.id);
            index.by_id.insert(booking.id, Arc::new(booking));
        }
        Self {
            bookings: RwLock::new(index),
            gift_cards: RwLock::new(GiftCardLedger::from_entries(snapshot.gift_card_entries)),
            booking_locks: LockTable::new(),
            gift_card_locks: LockTable::new(),
            intake: Mutex::new(()),
            codes,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            bookings: self.bookings().iter().map(|b| Booking::clone(b)).collect(),
            gift_card_entries: read(&self.gift_cards).entries().to_vec(),
            next_sequence: self.codes.peek(),
        }
    }

    pub fn booking_slot(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.booking_locks.slot(&id)
    }

    pub fn gift_card_slot(&self, code: &str) -> Arc<Mutex<()>> {
        self.gift_card_locks.slot(&normalize_code(code))
    }

    /// Serializes customer matching and code assignment during intake.
    pub fn intake_guard(&self) -> MutexGuard<'_, ()> {
        lock(&self.intake)
    }

    pub fn codes(&self) -> &BookingCodeGenerator {
        &self.codes
    }

    pub fn booking(&self, id: Uuid) -> Option<Arc<Booking>> {
        read(&self.bookings).by_id.get(&id).cloned()
    }

    pub fn booking_by_code(&self, code: &str) -> Option<Arc<Booking>> {
        let code = code.trim();
        read(&self.bookings)
            .by_id
            .values()
            .find(|booking| booking.code.eq_ignore_ascii_case(code))
            .cloned()
    }

    /// Committed bookings in insertion order.
    pub fn bookings(&self) -> Vec<Arc<Booking>> {
        let index = read(&self.bookings);
        index
            .order
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        read(&self.bookings).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against the committed gift card ledger.
    pub fn with_gift_cards<T>(&self, f: impl FnOnce(&GiftCardLedger) -> T) -> T {
        f(&read(&self.gift_cards))
    }

    /// Adds a new booking. Fails if the id or code is already present.
    pub fn insert(&self, booking: Booking, entries: Vec<GiftCardLedgerEntry>) -> Result<Arc<Booking>> {
        let mut index = write(&self.bookings);
        if index.by_id.contains_key(&booking.id)
            || index.by_id.values().any(|existing| existing.code == booking.code)
        {
            return Err(BookingError::InvalidInput(format!(
                "booking {} already exists",
                booking.code
            )));
        }
        self.append_gift_card_entries(entries);
        let booking = Arc::new(booking);
        index.order.push(booking.id);
        index.by_id.insert(booking.id, Arc::clone(&booking));
        Ok(booking)
    }

    /// Replaces a booking's committed snapshot along with its ledger entries.
    ///
    /// Callers must hold the booking's slot.
    pub fn commit(&self, booking: Booking, entries: Vec<GiftCardLedgerEntry>) -> Result<Arc<Booking>> {
        let mut index = write(&self.bookings);
        if !index.by_id.contains_key(&booking.id) {
            return Err(BookingError::NotFound(format!("booking {}", booking.code)));
        }
        self.append_gift_card_entries(entries);
        let booking = Arc::new(booking);
        index.by_id.insert(booking.id, Arc::clone(&booking));
        Ok(booking)
    }

    pub fn append_gift_card_entries(&self, entries: Vec<GiftCardLedgerEntry>) {
        if entries.is_empty() {
            return;
        }
        let mut ledger = write(&self.gift_cards);
        for entry in entries {
            ledger.append(entry);
        }
    }
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}
