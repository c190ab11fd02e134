//! Data models for the doctor schedule.
//!
//! This module defines the core data structures used throughout the crate:
//! - AppointmentStatus: lifecycle state reported by the backend
//! - StatusFilter: the filter tabs offered by the schedule view
//! - AppointmentAction: the transitions the view offers per status
//! - Appointment: a cached copy of a backend appointment record
//! - wire envelopes for the list and status-update endpoints

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// Lifecycle state of an appointment.
///
/// The backend owns this value and may add new ones; anything not
/// recognised is kept verbatim in `Other` so it still renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Scheduled,
    Completed,
    Cancelled,
    Other(String),
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Other(raw) => raw,
        }
    }

    /// No further action is offered once an appointment reaches this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl From<String> for AppointmentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => AppointmentStatus::Pending,
            "confirmed" => AppointmentStatus::Confirmed,
            "scheduled" => AppointmentStatus::Scheduled,
            "completed" => AppointmentStatus::Completed,
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Other(value),
        }
    }
}

impl From<&str> for AppointmentStatus {
    fn from(value: &str) -> Self {
        AppointmentStatus::from(value.to_string())
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter tabs of the schedule view.
///
/// `Scheduled` is a composite bucket covering every appointment that still
/// needs the doctor's attention, not only the literal `scheduled` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    All,
    #[default]
    Scheduled,
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl StatusFilter {
    pub const TABS: [StatusFilter; 6] = [
        StatusFilter::All,
        StatusFilter::Scheduled,
        StatusFilter::Pending,
        StatusFilter::Confirmed,
        StatusFilter::Completed,
        StatusFilter::Cancelled,
    ];

    /// Convert a string to a StatusFilter value.
    pub fn from_string(value: &str) -> Result<Self, String> {
        match value.to_lowercase().trim() {
            "all" => Ok(StatusFilter::All),
            "scheduled" => Ok(StatusFilter::Scheduled),
            "pending" => Ok(StatusFilter::Pending),
            "confirmed" => Ok(StatusFilter::Confirmed),
            "completed" => Ok(StatusFilter::Completed),
            "cancelled" => Ok(StatusFilter::Cancelled),
            _ => Err(format!(
                "Invalid filter: '{}'. Must be one of: all, scheduled, pending, confirmed, completed, cancelled",
                value
            )),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Scheduled => "scheduled",
            StatusFilter::Pending => "pending",
            StatusFilter::Confirmed => "confirmed",
            StatusFilter::Completed => "completed",
            StatusFilter::Cancelled => "cancelled",
        }
    }

    /// Whether an appointment with `status` is shown under this filter.
    pub fn matches(&self, status: &AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Scheduled => matches!(
                status,
                AppointmentStatus::Pending
                    | AppointmentStatus::Confirmed
                    | AppointmentStatus::Scheduled
            ),
            StatusFilter::Pending => *status == AppointmentStatus::Pending,
            StatusFilter::Confirmed => *status == AppointmentStatus::Confirmed,
            StatusFilter::Completed => *status == AppointmentStatus::Completed,
            StatusFilter::Cancelled => *status == AppointmentStatus::Cancelled,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A status transition the schedule view can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentAction {
    Confirm,
    Cancel,
    Complete,
}

impl AppointmentAction {
    pub fn name(&self) -> &str {
        match self {
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Complete => "complete",
        }
    }

    /// The status the backend is asked to move the appointment to.
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            AppointmentAction::Confirm => AppointmentStatus::Confirmed,
            AppointmentAction::Cancel => AppointmentStatus::Cancelled,
            AppointmentAction::Complete => AppointmentStatus::Completed,
        }
    }

    /// Actions offered for an appointment currently displayed as `status`.
    pub fn available_for(status: &AppointmentStatus) -> &'static [AppointmentAction] {
        match status {
            AppointmentStatus::Pending => &[AppointmentAction::Confirm, AppointmentAction::Cancel],
            AppointmentStatus::Confirmed | AppointmentStatus::Scheduled => {
                &[AppointmentAction::Complete]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Denormalized patient details attached to an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatientRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Display window of an appointment, as formatted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_time, self.end_time)
    }
}

/// Client-side copy of a backend appointment record.
///
/// Decoding is lenient: the identifier is read from `id`, falling back to
/// `_id`, a missing or null status becomes `Other("unknown")`, and
/// unreadable dates, patients or slots are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAppointment")]
pub struct Appointment {
    pub id: String,
    pub patient: Option<PatientRef>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub time_slot: Option<TimeSlot>,
    pub status: AppointmentStatus,
    pub doctor_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Wire shape of an appointment before normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAppointment {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_lenient")]
    legacy_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    patient: Option<PatientRef>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    appointment_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    time_slot: Option<TimeSlot>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    doctor_notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    created_at: Option<DateTime<Utc>>,
}

const UNKNOWN_STATUS: &str = "unknown";

impl TryFrom<RawAppointment> for Appointment {
    type Error = String;

    fn try_from(raw: RawAppointment) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .or(raw.legacy_id.filter(|id| !id.is_empty()))
            .ok_or_else(|| "appointment has no 'id' or '_id'".to_string())?;

        let status = raw
            .status
            .map(AppointmentStatus::from)
            .unwrap_or_else(|| AppointmentStatus::Other(UNKNOWN_STATUS.to_string()));

        Ok(Appointment {
            id,
            patient: raw.patient,
            appointment_date: raw.appointment_date,
            time_slot: raw.time_slot,
            status,
            doctor_notes: raw.doctor_notes,
            created_at: raw.created_at,
        })
    }
}

impl Appointment {
    /// Key used to order the schedule: the appointment date, falling back
    /// to the creation time.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.appointment_date.or(self.created_at)
    }

    pub fn patient_name(&self) -> &str {
        self.patient
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown patient")
    }

    pub fn available_actions(&self) -> &'static [AppointmentAction] {
        AppointmentAction::available_for(&self.status)
    }

    pub fn allows(&self, action: AppointmentAction) -> bool {
        self.available_actions().contains(&action)
    }
}

/// Accepts an RFC 3339 timestamp, a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// timestamp (read as UTC) or a bare `YYYY-MM-DD` date.
fn parse_flexible_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = deserialize_lenient(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = parse_flexible_date(&raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        warn!(value = %raw, "Ignoring unparseable appointment date");
    }
    Ok(parsed)
}

/// A value that either decodes as `T` or is skipped.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Malformed(IgnoredAny),
}

/// Decodes an optional field, treating a value of the wrong shape as absent.
fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Value(value)) => Ok(Some(value)),
        Some(Lenient::Malformed(_)) => {
            warn!("Ignoring malformed appointment field");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Decodes the `data` array record by record; unusable records are skipped.
fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<Appointment>, D::Error>
where
    D: Deserializer<'de>,
{
    let records: Option<Vec<Lenient<Appointment>>> = Option::deserialize(deserializer)?;
    let records = records.unwrap_or_default();
    let total = records.len();

    let appointments: Vec<Appointment> = records
        .into_iter()
        .filter_map(|record| match record {
            Lenient::Value(apt) => Some(apt),
            Lenient::Malformed(_) => None,
        })
        .collect();

    if appointments.len() < total {
        warn!(
            skipped = total - appointments.len(),
            total, "Skipped unreadable appointment records"
        );
    }
    Ok(appointments)
}

/// Body of `GET /api/appointment/doctor-schedule`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default, deserialize_with = "deserialize_records")]
    pub data: Vec<Appointment>,
}

/// Body of `PATCH /api/appointment/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_notes: Option<String>,
}

impl StatusUpdate {
    pub fn confirm() -> Self {
        StatusUpdate {
            status: AppointmentStatus::Confirmed,
            doctor_notes: None,
        }
    }

    pub fn cancel() -> Self {
        StatusUpdate {
            status: AppointmentStatus::Cancelled,
            doctor_notes: None,
        }
    }

    pub fn complete(doctor_notes: String) -> Self {
        StatusUpdate {
            status: AppointmentStatus::Completed,
            doctor_notes: Some(doctor_notes),
        }
    }
}
