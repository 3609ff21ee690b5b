pub mod analytics_service;
pub mod customer_service;
pub mod intake_service;
pub mod lifecycle_service;

pub use analytics_service::{
    AnalyticsService, AnalyticsSnapshot, FeeBreakdown, MonthlyRevenue, StaffUtilization,
};
pub use customer_service::CustomerService;
pub use intake_service::{BookingSeed, GiftCardRequest, IntakeContext, IntakeOutcome, IntakeService};
pub use lifecycle_service::{
    ActionOutcome, BookingAction, LifecycleContext, LifecycleService, ProcessorOutcome,
    ResponseStatus,
};
