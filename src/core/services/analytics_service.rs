//! Revenue, status, utilization, and no-show roll-ups folded from the booking set.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Booking, BookingStatus, PaymentKind, PaymentStatus};
use crate::ledger::payments;
use crate::money::Cents;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSnapshot {
    pub total_bookings: usize,
    /// Ascending by `YYYY-MM`.
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub status_counts: BTreeMap<BookingStatus, usize>,
    pub staff_utilization: Vec<StaffUtilization>,
    pub fees: FeeBreakdown,
    pub no_show_rate_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue_cents: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffUtilization {
    pub staff_id: String,
    pub staff_name: String,
    pub total_minutes: i64,
    pub captured_minutes: f64,
    pub utilization_percent: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub captured_cents: Cents,
    pub refunded_cents: Cents,
    pub platform_fee_cents: Cents,
    pub processor_fee_cents: Cents,
    /// Captured less refunds and fees, floored at zero.
    pub net_payout_cents: Cents,
}

/// Stateless analytics over any collection of bookings.
pub struct AnalyticsService;

impl AnalyticsService {
    /// Folds the full booking set into a fresh snapshot. Pure: the same input always
    /// yields the same output.
    pub fn recompute<B>(bookings: &[B]) -> AnalyticsSnapshot
    where
        B: Borrow<Booking>,
    {
        let mut months: BTreeMap<String, Cents> = BTreeMap::new();
        let mut status_counts: BTreeMap<BookingStatus, usize> = BTreeMap::new();
        let mut staff: Vec<StaffUtilization> = Vec::new();
        let mut fees = FeeBreakdown::default();
        let mut no_show_fees = 0usize;

        for booking in bookings {
            let booking: &Booking = booking.borrow();
            let realized = payments::realized_capture(booking);
            let refunded = payments::total_refunded(booking);

            let month = booking.starts_at.format("%Y-%m").to_string();
            *months.entry(month).or_default() += (realized - refunded).max(0);
            *status_counts.entry(booking.status).or_default() += 1;

            fees.captured_cents += realized;
            fees.refunded_cents += refunded;
            fees.platform_fee_cents += booking.financials.platform_fee_cents;
            fees.processor_fee_cents += booking.financials.processor_fee_cents;

            no_show_fees += payments::count_of(booking, PaymentKind::NoShowFee);

            if let Some(member) = booking.staff.as_ref() {
                let minutes = booking.duration_minutes();
                let credited = if has_captured_payment(booking) {
                    minutes as f64
                } else {
                    // Partial credit: an uncaptured slot still blocked half its time.
                    minutes as f64 / 2.0
                };
                match staff.iter_mut().find(|entry| entry.staff_id == member.id) {
                    Some(entry) => {
                        entry.total_minutes += minutes;
                        entry.captured_minutes += credited;
                    }
                    None => staff.push(StaffUtilization {
                        staff_id: member.id.clone(),
                        staff_name: member.name.clone(),
                        total_minutes: minutes,
                        captured_minutes: credited,
                        utilization_percent: 0,
                    }),
                }
            }
        }

        for entry in &mut staff {
            entry.utilization_percent =
                utilization_percent(entry.captured_minutes, entry.total_minutes);
        }

        fees.net_payout_cents = (fees.captured_cents
            - fees.refunded_cents
            - fees.platform_fee_cents
            - fees.processor_fee_cents)
            .max(0);

        let total = bookings.len();
        AnalyticsSnapshot {
            total_bookings: total,
            revenue_by_month: months
                .into_iter()
                .map(|(month, revenue_cents)| MonthlyRevenue {
                    month,
                    revenue_cents,
                })
                .collect(),
            status_counts,
            staff_utilization: staff,
            fees,
            no_show_rate_percent: percent(no_show_fees as f64, total),
        }
    }
}

fn has_captured_payment(booking: &Booking) -> bool {
    booking
        .payments
        .iter()
        .any(|payment| payment.status == PaymentStatus::Captured)
}

fn utilization_percent(captured_minutes: f64, total_minutes: i64) -> u32 {
    let total = total_minutes.max(1) as f64;
    ((captured_minutes / total) * 100.0).round().clamp(0.0, 100.0) as u32
}

fn percent(numerator: f64, denominator: usize) -> u32 {
    ((numerator / denominator.max(1) as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StaffRef;
    use crate::test_support::{captured_booking, sample_booking};
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_set_yields_zeroes() {
        let bookings: Vec<Booking> = Vec::new();
        let snapshot = AnalyticsService::recompute(&bookings);
        assert_eq!(snapshot, AnalyticsSnapshot::default());
        assert_eq!(snapshot.no_show_rate_percent, 0);
    }

    #[test]
    fn utilization_gives_half_credit_to_uncaptured_slots() {
        let staff = StaffRef {
            id: "sam".into(),
            name: "Sam".into(),
        };
        let mut open = sample_booking(10_000);
        open.staff = Some(staff.clone());
        let mut done = captured_booking(10_000);
        done.staff = Some(staff);

        let snapshot = AnalyticsService::recompute(&[open, done]);
        let sam = &snapshot.staff_utilization[0];
        assert_eq!(sam.total_minutes, 120);
        assert_eq!(sam.captured_minutes, 90.0);
        assert_eq!(sam.utilization_percent, 75);
    }

    #[test]
    fn revenue_is_grouped_by_start_month() {
        let mut march = captured_booking(10_000);
        march.starts_at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        march.ends_at = march.starts_at + chrono::Duration::minutes(60);
        let mut january = captured_booking(5_000);
        january.starts_at = Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap();
        january.ends_at = january.starts_at + chrono::Duration::minutes(60);

        let snapshot = AnalyticsService::recompute(&[march, january]);
        let months: Vec<_> = snapshot
            .revenue_by_month
            .iter()
            .map(|entry| (entry.month.as_str(), entry.revenue_cents))
            .collect();
        assert_eq!(months, vec![("2026-01", 5_000), ("2026-03", 10_000)]);
        assert_eq!(snapshot.status_counts.get(&BookingStatus::Captured), Some(&2));
    }
}
