//! CircDesk
//!
//! A terminal circulation-desk client for a library borrow-management REST
//! backend: pending-request queue, record search, record form, and record
//! creation, all driving the borrow-record lifecycle through one workflow
//! module.

pub mod client;
pub mod config;
pub mod desk;
pub mod error;
pub mod models;
pub mod session;
pub mod workflow;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::Session;
