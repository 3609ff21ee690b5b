pub mod codes;
pub mod engine;
pub mod services;
pub mod store;
pub mod time;

pub use engine::{ActionResponse, BookingEngine};
pub use store::{BookingStore, StoreSnapshot};
pub use time::{Clock, FixedClock, SystemClock};
