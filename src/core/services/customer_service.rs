use std::borrow::Borrow;
use std::collections::HashSet;

use crate::domain::{Booking, Customer, Identifiable};

pub struct CustomerService;

impl CustomerService {
    /// Distinct customers across bookings, in first-seen order.
    pub fn derive_customers<B>(bookings: &[B]) -> Vec<Customer>
    where
        B: Borrow<Booking>,
    {
        let mut seen = HashSet::new();
        bookings
            .iter()
            .map(|booking| &booking.borrow().customer)
            .filter(|customer| seen.insert(customer.id()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_booking;

    #[test]
    fn dedupes_by_id_keeping_first_seen_order() {
        let first = sample_booking(1_000);
        let second = sample_booking(2_000);
        let mut repeat = sample_booking(3_000);
        repeat.customer = first.customer.clone();

        let customers =
            CustomerService::derive_customers(&[first.clone(), second.clone(), repeat]);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].id, first.customer.id);
        assert_eq!(customers[1].id, second.customer.id);
    }
}
