//! Client for the FitBuddy doctor schedule.
//!
//! Loads a doctor's appointments from the FitBuddy backend, derives the
//! filtered and paginated view the doctor panel shows, and sends the
//! confirm / cancel / complete status transitions back to the backend.

pub mod api;
pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod pagination;
pub mod schedule;

pub use api::{HttpScheduleApi, MockScheduleApi, ScheduleApi, SessionContext};
pub use controller::AppointmentViewController;
pub use error::ScheduleError;
pub use models::{Appointment, AppointmentAction, AppointmentStatus, StatusFilter};
