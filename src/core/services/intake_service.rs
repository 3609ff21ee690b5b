//! Public booking intake: turns a booking request into an authorized booking.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    customer::{normalize_email, normalize_phone},
    gift_card::normalize_code,
    Booking, BookingStatus, Customer, CustomerContact, GiftCardKind, GiftCardLedgerEntry,
    GiftCardProgram, GiftCardReason, Payment, PaymentKind, PaymentStatus, PolicyConsent,
    ServiceCatalog, ServiceRef, StaffDirectory, StaffRef,
};
use crate::errors::{BookingError, Result};
use crate::ledger::{GiftCardLedger, GiftCardMovement};
use crate::money::{Cents, CurrencyCode, Financials};

/// Everything the public booking form submits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingSeed {
    pub service_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    /// Defaults to the service duration after `starts_at`.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub customer: CustomerContact,
    pub consent: PolicyConsent,
    #[serde(default)]
    pub gift_card: Option<GiftCardRequest>,
    #[serde(default)]
    pub requires_action: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingSeed {
    pub fn new(
        service_id: impl Into<String>,
        starts_at: DateTime<Utc>,
        customer: CustomerContact,
        consent: PolicyConsent,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            staff_id: None,
            starts_at,
            ends_at: None,
            customer,
            consent,
            gift_card: None,
            requires_action: false,
            notes: None,
        }
    }

    pub fn with_staff(mut self, staff_id: impl Into<String>) -> Self {
        self.staff_id = Some(staff_id.into());
        self
    }

    pub fn with_gift_card(mut self, code: impl Into<String>, requested_cents: Cents) -> Self {
        self.gift_card = Some(GiftCardRequest {
            code: code.into(),
            requested_cents,
        });
        self
    }

    pub fn requiring_action(mut self) -> Self {
        self.requires_action = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftCardRequest {
    pub code: String,
    pub requested_cents: Cents,
}

/// Collaborators and settings needed to admit a booking.
pub struct IntakeContext<'a> {
    pub services: &'a dyn ServiceCatalog,
    pub staff: &'a dyn StaffDirectory,
    pub program: &'a GiftCardProgram,
    pub currency: &'a CurrencyCode,
    pub booking_code: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
    pub booking: Booking,
    pub gift_card_entry: Option<GiftCardLedgerEntry>,
}

pub struct IntakeService;

impl IntakeService {
    pub fn create(
        seed: BookingSeed,
        ctx: IntakeContext<'_>,
        customers: &[Customer],
        gift_cards: &GiftCardLedger,
    ) -> Result<IntakeOutcome> {
        let service = ctx
            .services
            .service(&seed.service_id)
            .ok_or_else(|| BookingError::NotFound(format!("service {}", seed.service_id)))?;
        if service.price_cents < 0 {
            return Err(BookingError::InvalidInput(format!(
                "service {} has a negative price",
                service.id
            )));
        }
        let staff = match seed.staff_id.as_deref() {
            Some(id) => Some(
                ctx.staff
                    .staff_member(id)
                    .ok_or_else(|| BookingError::NotFound(format!("staff member {id}")))?,
            ),
            None => None,
        };
        let ends_at = seed
            .ends_at
            .unwrap_or(seed.starts_at + Duration::minutes(i64::from(service.duration_minutes)));
        if ends_at <= seed.starts_at {
            return Err(BookingError::InvalidInput(
                "booking must end after it starts".into(),
            ));
        }
        if seed.consent.policy_hash.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "policy consent hash is required".into(),
            ));
        }
        let customer = Self::resolve_customer(&seed.customer, customers)?;

        let list_price = service.price_cents;
        let (gift_code, gift_applied) = match seed.gift_card.as_ref() {
            Some(request) => {
                let applied =
                    Self::gift_card_amount(request, list_price, ctx.program, gift_cards);
                (Some(normalize_code(&request.code)), applied)
            }
            None => (None, 0),
        };
        let authorization_amount = list_price - gift_applied;

        let booking_id = Uuid::new_v4();
        let (status, payment_status) = if seed.requires_action {
            (BookingStatus::RequiresAction, PaymentStatus::RequiresAction)
        } else {
            (BookingStatus::Authorized, PaymentStatus::Authorized)
        };
        let authorization = Payment::new(
            booking_id,
            PaymentKind::Authorization,
            authorization_amount,
            payment_status,
            ctx.now,
        );

        let gift_card_entry = match gift_code.as_deref() {
            Some(code) if gift_applied > 0 => {
                let movement =
                    GiftCardMovement::new(code, -gift_applied, GiftCardReason::Redeemed)
                        .for_booking(ctx.booking_code.clone());
                Some(gift_cards.prepare(movement, ctx.program.kind, ctx.now)?)
            }
            _ => None,
        };

        let booking = Booking {
            id: booking_id,
            code: ctx.booking_code,
            status,
            service: ServiceRef::from(&service),
            staff: staff.as_ref().map(StaffRef::from),
            customer,
            starts_at: seed.starts_at,
            ends_at,
            payments: vec![authorization],
            financials: Financials::unrealized(list_price, gift_applied, ctx.currency.clone()),
            consent: seed.consent,
            requires_action: seed.requires_action,
            gift_card_code: gift_code.filter(|_| gift_applied > 0),
            notes: seed.notes,
            created_at: ctx.now,
            updated_at: ctx.now,
        };
        Ok(IntakeOutcome {
            booking,
            gift_card_entry,
        })
    }

    /// Finds a known customer by normalized email, then normalized phone, or creates one.
    pub fn resolve_customer(contact: &CustomerContact, customers: &[Customer]) -> Result<Customer> {
        let email = contact.email.as_deref().and_then(normalize_email);
        let phone = contact.phone.as_deref().and_then(normalize_phone);
        if email.is_none() && phone.is_none() {
            return Err(BookingError::InvalidInput(
                "customer needs an email address or phone number".into(),
            ));
        }
        if let Some(email) = email.as_deref() {
            if let Some(found) = customers.iter().find(|c| c.matches_email(email)) {
                return Ok(found.clone());
            }
        }
        if let Some(phone) = phone.as_deref() {
            if let Some(found) = customers.iter().find(|c| c.matches_phone(phone)) {
                return Ok(found.clone());
            }
        }
        Ok(Customer::from_contact(contact))
    }

    /// Clamps the requested amount to `[0, list_price]` and, for stored-value
    /// programs, to the code's latest balance. A disabled program or an unknown
    /// code applies nothing.
    pub fn gift_card_amount(
        request: &GiftCardRequest,
        list_price: Cents,
        program: &GiftCardProgram,
        gift_cards: &GiftCardLedger,
    ) -> Cents {
        if !program.enabled {
            warn!(code = %request.code, "gift cards are disabled; ignoring code");
            return 0;
        }
        let known = program.knows(&request.code) || gift_cards.latest(&request.code).is_some();
        if !known {
            warn!(code = %normalize_code(&request.code), "unknown gift card code ignored");
            return 0;
        }
        let clamped = request.requested_cents.clamp(0, list_price.max(0));
        match program.kind {
            GiftCardKind::Amount => clamped.min(gift_cards.balance(&request.code)),
            GiftCardKind::Percent => clamped,
        }
    }
}
