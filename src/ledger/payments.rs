//! Append-only payment ledger helpers over a booking's payment list.

use crate::domain::{Booking, Payment, PaymentKind};
use crate::money::Cents;

/// Adds a record to the end of the booking's ledger. Records are never reordered or removed.
pub fn append(booking: &mut Booking, record: Payment) {
    booking.payments.push(record);
}

/// Sum of captured charges (`capture`, `no_show_fee`, `cancel_fee`).
pub fn realized_capture(booking: &Booking) -> Cents {
    booking
        .payments
        .iter()
        .filter(|payment| payment.is_realized_capture())
        .map(|payment| payment.amount_cents)
        .sum()
}

pub fn total_refunded(booking: &Booking) -> Cents {
    booking
        .payments
        .iter()
        .filter(|payment| payment.kind == PaymentKind::Refund)
        .map(|payment| payment.amount_cents)
        .sum()
}

/// Captured money not yet returned to the customer.
pub fn refundable(booking: &Booking) -> Cents {
    (realized_capture(booking) - total_refunded(booking)).max(0)
}

pub fn count_of(booking: &Booking, kind: PaymentKind) -> usize {
    booking
        .payments
        .iter()
        .filter(|payment| payment.kind == kind)
        .count()
}
