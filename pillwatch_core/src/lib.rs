#![forbid(unsafe_code)]

//! Core domain model and business logic for the Pillwatch system.
//!
//! This crate provides:
//! - Domain types (medicine records, stock levels, alerts)
//! - Time-based stock depletion model
//! - Notification policy with snooze lifecycle
//! - Recurring sweep scheduler
//! - Persistence (file-backed record store, alert outbox)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod stock;
pub mod policy;
pub mod restock;
pub mod store;
pub mod notify;
pub mod sweep;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use clock::{Clock, FixedClock, SystemClock};
pub use stock::evaluate;
pub use policy::should_alert;
pub use restock::restock;
pub use store::{FileStore, Store};
pub use notify::{compose_alert, read_outbox, Notifier, OutboxNotifier};
pub use sweep::Sweeper;
