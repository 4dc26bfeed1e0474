//! HTTP request handlers.

pub mod events;
pub mod health;
pub mod transactions;

pub use events::last_event;
pub use health::{build_info, good_to_go, health_report};
pub use transactions::transactions;
