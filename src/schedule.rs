//! Doctor schedule loading.
//!
//! `DoctorSchedule` holds the last list of appointments fetched from the
//! backend, ordered newest first. A failed refresh leaves that list alone.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::ScheduleApi;
use crate::error::ScheduleError;
use crate::models::Appointment;

/// Order appointments newest first by appointment date, falling back to
/// creation time. Records with neither go last. Ties keep backend order.
pub fn sort_newest_first(appointments: &mut [Appointment]) {
    // Option orders None below Some, so the reversed compare sinks undated
    // records; sort_by is stable.
    appointments.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

#[derive(Debug, Clone, Default)]
pub struct DoctorSchedule {
    appointments: Vec<Appointment>,
    loaded_at: Option<DateTime<Utc>>,
}

impl DoctorSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all loaded appointments, newest first.
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// When the list was last replaced by a successful fetch.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Get an appointment by its ID.
    pub fn get_appointment_by_id(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    /// Fetch the full schedule and replace the cached list. The call blocks
    /// for the whole request, so there is no separate loading state.
    ///
    /// Returns the number of appointments loaded. On failure the previous
    /// list is kept and the error is returned.
    pub fn refresh<A: ScheduleApi + ?Sized>(&mut self, api: &A) -> Result<usize, ScheduleError> {
        match api.fetch_schedule() {
            Ok(mut appointments) => {
                sort_newest_first(&mut appointments);
                let count = appointments.len();
                self.appointments = appointments;
                self.loaded_at = Some(Utc::now());
                info!(count, "Loaded doctor schedule");
                Ok(count)
            }
            Err(e) => {
                warn!(
                    "Failed to load doctor schedule, keeping {} cached appointments: {e}",
                    self.appointments.len()
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Display for DoctorSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DoctorSchedule(appointments={})", self.appointments.len())
    }
}
