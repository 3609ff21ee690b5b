pub mod booking;
pub mod catalog;
pub mod common;
pub mod customer;
pub mod gift_card;
pub mod payment;
pub mod policy;

pub use booking::{Booking, BookingStatus, ServiceRef, StaffRef};
pub use catalog::{Catalog, Service, ServiceCatalog, StaffDirectory, StaffMember};
pub use common::{Displayable, Identifiable};
pub use customer::{Customer, CustomerContact};
pub use gift_card::{GiftCardKind, GiftCardLedgerEntry, GiftCardProgram, GiftCardReason};
pub use payment::{Payment, PaymentKind, PaymentStatus};
pub use policy::{ConsentOrigin, Policies, PolicyConsent};
