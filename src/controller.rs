//! Appointment view controller.
//!
//! Ties the loaded schedule, the filter/page selection and the completion
//! dialog together, and turns user actions into backend status updates.
//! Every successful update is followed by a full refetch; the local list
//! is never patched in place.

use tracing::{info, warn};

use crate::api::ScheduleApi;
use crate::completion::CompletionDialog;
use crate::error::ScheduleError;
use crate::models::{Appointment, AppointmentAction, StatusFilter, StatusUpdate};
use crate::pagination::{self, PageToken, PageView, ViewState, PAGE_SIZE};
use crate::schedule::DoctorSchedule;

const LOAD_FAILED: &str = "Failed to load appointments. Please try again.";

fn action_failed(action: AppointmentAction) -> String {
    format!("Failed to {} appointment. Please try again.", action.name())
}

/// Drives the doctor schedule view: loading, filtering, paging and status transitions.
pub struct AppointmentViewController<A: ScheduleApi> {
    api: A,
    schedule: DoctorSchedule,
    view: ViewState,
    dialog: CompletionDialog,
    error: Option<String>,
}

impl<A: ScheduleApi> AppointmentViewController<A> {
    /// Initialize the controller. Nothing is fetched until `load`.
    pub fn new(api: A) -> Self {
        AppointmentViewController {
            api,
            schedule: DoctorSchedule::new(),
            view: ViewState::default(),
            dialog: CompletionDialog::new(),
            error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn appointments(&self) -> &[Appointment] {
        self.schedule.appointments()
    }

    pub fn schedule(&self) -> &DoctorSchedule {
        &self.schedule
    }

    /// Message for the error banner, if the last action failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn filter(&self) -> StatusFilter {
        self.view.filter()
    }

    pub fn page(&self) -> usize {
        self.view.page()
    }

    pub fn dialog(&self) -> &CompletionDialog {
        &self.dialog
    }

    /// Fetch the full schedule. A successful load returns to page 1.
    pub fn load(&mut self) -> Result<usize, ScheduleError> {
        self.error = None;
        match self.schedule.refresh(&self.api) {
            Ok(count) => {
                self.view.reset_page();
                Ok(count)
            }
            Err(e) => {
                self.error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.view.set_filter(filter);
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.set_page(page);
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.visible().total_pages;
        self.view.next_page(total)
    }

    pub fn previous_page(&mut self) -> bool {
        self.view.previous_page()
    }

    /// The current page of the filtered schedule.
    pub fn visible(&self) -> PageView<'_> {
        pagination::paginate(self.schedule.appointments(), &self.view, PAGE_SIZE)
    }

    pub fn page_window(&self) -> Vec<PageToken> {
        pagination::page_window(self.view.page(), self.visible().total_pages)
    }

    pub fn counts(&self) -> Vec<(StatusFilter, usize)> {
        pagination::count_by_filter(self.schedule.appointments())
    }

    /// Check that `action` is offered for the appointment as currently
    /// displayed. Nothing is sent when it isn't.
    fn ensure_allowed(&self, id: &str, action: AppointmentAction) -> Result<(), ScheduleError> {
        let appointment = self
            .schedule
            .get_appointment_by_id(id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        if !appointment.allows(action) {
            return Err(ScheduleError::ActionNotAllowed {
                action,
                status: appointment.status.clone(),
            });
        }
        Ok(())
    }

    fn transition(
        &mut self,
        id: &str,
        action: AppointmentAction,
        update: StatusUpdate,
    ) -> Result<(), ScheduleError> {
        self.error = None;
        if let Err(e) = self.ensure_allowed(id, action) {
            self.error = Some(e.to_string());
            return Err(e);
        }

        if let Err(e) = self.api.update_status(id, &update) {
            warn!(appointment_id = id, "Failed to {action} appointment: {e}");
            self.error = Some(action_failed(action));
            return Err(e);
        }

        info!(appointment_id = id, status = %update.status, "Appointment updated");
        self.load().map(|_| ())
    }

    /// Confirm a pending appointment.
    pub fn confirm(&mut self, id: &str) -> Result<(), ScheduleError> {
        self.transition(id, AppointmentAction::Confirm, StatusUpdate::confirm())
    }

    /// Cancel a pending appointment.
    pub fn cancel(&mut self, id: &str) -> Result<(), ScheduleError> {
        self.transition(id, AppointmentAction::Cancel, StatusUpdate::cancel())
    }

    /// Open the notes dialog for a confirmed or scheduled appointment.
    pub fn open_completion(&mut self, id: &str) -> Result<(), ScheduleError> {
        self.ensure_allowed(id, AppointmentAction::Complete)?;
        if !self.dialog.open(id) {
            return Err(ScheduleError::SubmissionInProgress);
        }
        Ok(())
    }

    pub fn set_completion_notes(&mut self, notes: &str) {
        self.dialog.set_notes(notes);
    }

    /// Dismiss the notes dialog. Returns false while a submission is in
    /// flight.
    pub fn close_completion(&mut self) -> bool {
        self.dialog.close()
    }

    /// Submit the open dialog.
    ///
    /// On success the dialog closes, its notes are cleared and the schedule
    /// is refetched. On failure the dialog stays open with the notes intact.
    pub fn submit_completion(&mut self) -> Result<(), ScheduleError> {
        // validation errors stay inline on the dialog
        let draft = self.dialog.begin_submit()?;
        self.error = None;

        if let Err(e) = self.ensure_allowed(&draft.appointment_id, AppointmentAction::Complete) {
            self.dialog.finish_submit(false);
            self.error = Some(e.to_string());
            return Err(e);
        }

        let update = StatusUpdate::complete(draft.notes);
        match self.api.update_status(&draft.appointment_id, &update) {
            Ok(()) => {
                info!(appointment_id = %draft.appointment_id, "Appointment completed");
                self.dialog.finish_submit(true);
                self.load().map(|_| ())
            }
            Err(e) => {
                warn!(
                    appointment_id = %draft.appointment_id,
                    "Failed to complete appointment: {e}"
                );
                self.dialog.finish_submit(false);
                self.error = Some(action_failed(AppointmentAction::Complete));
                Err(e)
            }
        }
    }

    /// Open the dialog for `id`, enter `notes` and submit in one step.
    pub fn complete(&mut self, id: &str, notes: &str) -> Result<(), ScheduleError> {
        self.open_completion(id)?;
        self.set_completion_notes(notes);
        self.submit_completion()
    }
}
