//! The booking aggregate: one scheduled appointment and its financial history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    catalog::{Service, StaffMember},
    common::*,
    customer::Customer,
    payment::{Payment, PaymentKind},
    policy::PolicyConsent,
};
use crate::money::Financials;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub status: BookingStatus,
    pub service: ServiceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffRef>,
    pub customer: Customer,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub payments: Vec<Payment>,
    pub financials: Financials,
    pub consent: PolicyConsent,
    #[serde(default)]
    pub requires_action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_card_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn has_payment_of(&self, kind: PaymentKind) -> bool {
        self.payments.iter().any(|payment| payment.kind == kind)
    }

    /// The authorization record that opens every booking's ledger.
    pub fn authorization(&self) -> Option<&Payment> {
        self.payments
            .iter()
            .find(|payment| payment.kind == PaymentKind::Authorization)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.ends_at - self.starts_at).num_minutes().max(0)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Identifiable for Booking {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Booking {
    fn display_label(&self) -> String {
        format!("{} {} [{}]", self.code, self.service.name, self.status)
    }
}

/// Lifecycle status of a booking.
///
/// `RequiresAction` is the only non-monotonic state: it gates an action until the
/// customer completes an external authentication step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Authorized,
    RequiresAction,
    Captured,
    NoShow,
    Canceled,
    Refunded,
    Expired,
    Disputed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 9] = [
        BookingStatus::Pending,
        BookingStatus::Authorized,
        BookingStatus::RequiresAction,
        BookingStatus::Captured,
        BookingStatus::NoShow,
        BookingStatus::Canceled,
        BookingStatus::Refunded,
        BookingStatus::Expired,
        BookingStatus::Disputed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Captured
                | BookingStatus::NoShow
                | BookingStatus::Canceled
                | BookingStatus::Refunded
                | BookingStatus::Expired
                | BookingStatus::Disputed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Authorized => "authorized",
            BookingStatus::RequiresAction => "requires_action",
            BookingStatus::Captured => "captured",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Canceled => "canceled",
            BookingStatus::Refunded => "refunded",
            BookingStatus::Expired => "expired",
            BookingStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy of the catalog entry taken at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRef {
    pub id: String,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
}

impl From<&Service> for ServiceRef {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            category: service.category.clone(),
            duration_minutes: service.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffRef {
    pub id: String,
    pub name: String,
}

impl From<&StaffMember> for StaffRef {
    fn from(member: &StaffMember) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
        }
    }
}
