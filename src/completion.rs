//! State of the dialog that collects doctor notes before completing an
//! appointment.

use crate::error::ScheduleError;

/// What a submission sends to the backend, captured when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionDraft {
    pub appointment_id: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionDialog {
    appointment_id: Option<String>,
    notes: String,
    is_submitting: bool,
    validation_error: Option<String>,
}

impl CompletionDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog for `appointment_id` with an empty notes field.
    ///
    /// Ignored while a submission is in flight.
    pub fn open(&mut self, appointment_id: &str) -> bool {
        if self.is_submitting {
            return false;
        }
        self.appointment_id = Some(appointment_id.to_string());
        self.notes.clear();
        self.validation_error = None;
        true
    }

    pub fn is_open(&self) -> bool {
        self.appointment_id.is_some()
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.appointment_id.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    pub fn set_notes(&mut self, notes: &str) {
        if self.is_submitting {
            return;
        }
        self.notes = notes.to_string();
        self.validation_error = None;
    }

    /// Whether the submit button is enabled.
    pub fn can_submit(&self) -> bool {
        self.is_open() && !self.is_submitting && !self.notes.trim().is_empty()
    }

    /// Dismiss the dialog. A no-op returning false while submitting.
    pub fn close(&mut self) -> bool {
        if self.is_submitting {
            return false;
        }
        *self = Self::default();
        true
    }

    /// Start a submission, taking the submit guard.
    ///
    /// Blank notes fail here with an inline validation message and leave
    /// the dialog as it was.
    pub fn begin_submit(&mut self) -> Result<CompletionDraft, ScheduleError> {
        let appointment_id = self
            .appointment_id
            .clone()
            .ok_or(ScheduleError::DialogClosed)?;
        if self.is_submitting {
            return Err(ScheduleError::SubmissionInProgress);
        }
        if self.notes.trim().is_empty() {
            let err = ScheduleError::EmptyNotes;
            self.validation_error = Some(err.to_string());
            return Err(err);
        }

        self.is_submitting = true;
        self.validation_error = None;
        Ok(CompletionDraft {
            appointment_id,
            notes: self.notes.clone(),
        })
    }

    /// Release the submit guard. A successful submission closes the dialog
    /// and clears the notes; a failed one keeps both for a retry.
    pub fn finish_submit(&mut self, succeeded: bool) {
        self.is_submitting = false;
        if succeeded {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_clears_previous_notes() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("left over");
        dialog.close();
        dialog.open("a2");
        assert_eq!(dialog.appointment_id(), Some("a2"));
        assert_eq!(dialog.notes(), "");
    }

    #[test]
    fn reopening_without_closing_clears_notes() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("for a1");
        dialog.open("a2");
        assert_eq!(dialog.notes(), "");
    }

    #[test]
    fn submit_disabled_for_blank_notes() {
        let mut dialog = CompletionDialog::new();
        assert!(!dialog.can_submit());
        dialog.open("a1");
        assert!(!dialog.can_submit());
        dialog.set_notes("   \n\t");
        assert!(!dialog.can_submit());
        dialog.set_notes("ok");
        assert!(dialog.can_submit());
    }

    #[test]
    fn blank_notes_fail_validation() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("  ");
        assert!(matches!(dialog.begin_submit(), Err(ScheduleError::EmptyNotes)));
        assert!(dialog.validation_error().is_some());
        assert!(!dialog.is_submitting());
        assert!(dialog.is_open());

        dialog.set_notes("fine");
        assert!(dialog.validation_error().is_none());
    }

    #[test]
    fn closed_dialog_cannot_submit() {
        let mut dialog = CompletionDialog::new();
        assert!(matches!(dialog.begin_submit(), Err(ScheduleError::DialogClosed)));
    }

    #[test]
    fn close_is_blocked_while_submitting() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("Patient advised rest");
        let draft = dialog.begin_submit().unwrap();
        assert_eq!(draft.appointment_id, "a1");
        assert_eq!(draft.notes, "Patient advised rest");

        assert!(!dialog.close());
        assert!(dialog.is_open());
        assert!(!dialog.can_submit());
        assert!(matches!(
            dialog.begin_submit(),
            Err(ScheduleError::SubmissionInProgress)
        ));
        assert!(!dialog.open("a2"));
        dialog.set_notes("changed mid-flight");
        assert_eq!(dialog.notes(), "Patient advised rest");
    }

    #[test]
    fn success_closes_and_clears() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("done");
        dialog.begin_submit().unwrap();
        dialog.finish_submit(true);
        assert!(!dialog.is_open());
        assert_eq!(dialog.notes(), "");
        assert!(!dialog.is_submitting());
    }

    #[test]
    fn failure_keeps_notes_for_retry() {
        let mut dialog = CompletionDialog::new();
        dialog.open("a1");
        dialog.set_notes("keep me");
        dialog.begin_submit().unwrap();
        dialog.finish_submit(false);
        assert!(dialog.is_open());
        assert_eq!(dialog.notes(), "keep me");
        assert!(dialog.can_submit());
    }
}
