use thiserror::Error;

use crate::models::{AppointmentAction, AppointmentStatus};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Doctor notes are required to complete an appointment")]
    EmptyNotes,

    #[error("Appointment {0} is not in the loaded schedule")]
    NotFound(String),

    #[error("Cannot {action} an appointment that is {status}")]
    ActionNotAllowed {
        action: AppointmentAction,
        status: AppointmentStatus,
    },

    #[error("No completion dialog is open")]
    DialogClosed,

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScheduleError {
    /// Failures detected locally, before any request is sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ScheduleError::EmptyNotes
                | ScheduleError::NotFound(_)
                | ScheduleError::ActionNotAllowed { .. }
                | ScheduleError::DialogClosed
                | ScheduleError::SubmissionInProgress
                | ScheduleError::Config(_)
        )
    }
}
