use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;
use crate::money::Cents;

/// One monetary event belonging to exactly one booking. Never mutated once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub kind: PaymentKind,
    pub amount_cents: Cents,
    pub status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Payment {
    /// Records a payment; negative amounts are floored at zero.
    pub fn new(
        booking_id: Uuid,
        kind: PaymentKind,
        amount_cents: Cents,
        status: PaymentStatus,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            kind,
            amount_cents: amount_cents.max(0),
            status,
            recorded_at,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether this record contributes to the booking's realized capture.
    pub fn is_realized_capture(&self) -> bool {
        self.status == PaymentStatus::Captured && self.kind.is_charge()
    }
}

impl Identifiable for Payment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Payment {
    fn display_label(&self) -> String {
        format!("{} {} [{}]", self.kind, self.amount_cents, self.status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Authorization,
    Capture,
    NoShowFee,
    CancelFee,
    Refund,
}

impl PaymentKind {
    /// Kinds that move money from the customer to the business.
    pub fn is_charge(self) -> bool {
        matches!(
            self,
            PaymentKind::Capture | PaymentKind::NoShowFee | PaymentKind::CancelFee
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentKind::Authorization => "authorization",
            PaymentKind::Capture => "capture",
            PaymentKind::NoShowFee => "no_show_fee",
            PaymentKind::CancelFee => "cancel_fee",
            PaymentKind::Refund => "refund",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresAction,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}
