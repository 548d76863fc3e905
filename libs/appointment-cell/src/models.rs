// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use doctor_cell::models::Slot;
use shared_models::ApiError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Client-side copy of a backend appointment, as listed in the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: i64,
    pub date: NaiveDate,
    pub slot_id: i64,
    pub staff_id: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Appointment {
    pub fn is_upcoming(&self) -> bool {
        self.status == AppointmentStatus::Upcoming
    }
}

/// Backend appointment status. Unknown values are kept verbatim for display
/// and carry no behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
    Rescheduled,
    Other(String),
}

impl From<String> for AppointmentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upcoming" => AppointmentStatus::Upcoming,
            "completed" => AppointmentStatus::Completed,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            "rescheduled" => AppointmentStatus::Rescheduled,
            _ => AppointmentStatus::Other(raw),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

// ==============================================================================
// FLOW MODELS
// ==============================================================================

/// What a booking flow is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowMode {
    Book {
        doctor_id: String,
    },
    Reschedule {
        appointment_id: i64,
        doctor_id: String,
        current_date: NaiveDate,
        current_slot_id: i64,
        previous_reason: Option<String>,
    },
}

impl FlowMode {
    pub fn book(doctor_id: impl Into<String>) -> Self {
        FlowMode::Book {
            doctor_id: doctor_id.into(),
        }
    }

    /// Reschedule flow for an existing appointment. Only upcoming
    /// appointments can be moved.
    pub fn reschedule(appointment: &Appointment) -> Result<Self, AppointmentError> {
        if !appointment.is_upcoming() {
            return Err(AppointmentError::NotReschedulable {
                appointment_id: appointment.appointment_id,
                status: appointment.status.clone(),
            });
        }

        Ok(FlowMode::Reschedule {
            appointment_id: appointment.appointment_id,
            doctor_id: appointment.staff_id.clone(),
            current_date: appointment.date,
            current_slot_id: appointment.slot_id,
            previous_reason: appointment.reason.clone(),
        })
    }

    pub fn doctor_id(&self) -> &str {
        match self {
            FlowMode::Book { doctor_id } | FlowMode::Reschedule { doctor_id, .. } => doctor_id,
        }
    }

    pub fn appointment_id(&self) -> Option<i64> {
        match self {
            FlowMode::Book { .. } => None,
            FlowMode::Reschedule { appointment_id, .. } => Some(*appointment_id),
        }
    }

    /// First date shown: today for new bookings, the appointment's own date
    /// for reschedules (never earlier than today).
    pub fn initial_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            FlowMode::Book { .. } => today,
            FlowMode::Reschedule { current_date, .. } => (*current_date).max(today),
        }
    }
}

/// In-progress booking or reschedule, local to one flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub doctor_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub slot: Option<Slot>,
    pub reason: String,
}

impl AppointmentDraft {
    pub fn new(doctor_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            doctor_id: Some(doctor_id.into()),
            date: Some(date),
            slot: None,
            reason: String::new(),
        }
    }

    pub fn for_mode(mode: &FlowMode, date: NaiveDate) -> Self {
        let mut draft = Self::new(mode.doctor_id(), date);
        if let FlowMode::Reschedule { previous_reason: Some(reason), .. } = mode {
            draft.reason = reason.clone();
        }
        draft
    }

    /// Slot ids are scoped to a date, so changing the date drops the selection.
    pub fn set_date(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.slot = None;
        }
        self.date = Some(date);
    }

    pub fn select_slot(&mut self, slot: Slot) {
        self.slot = Some(slot);
    }

    pub fn clear_slot(&mut self) {
        self.slot = None;
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = reason.into();
    }
}

/// Validated, immutable submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentRequest {
    doctor_id: String,
    date: String,
    slot_id: i64,
    reason: String,
}

impl AppointmentRequest {
    pub(crate) fn new(doctor_id: String, date: NaiveDate, slot_id: i64, reason: String) -> Self {
        Self {
            doctor_id,
            date: date.format("%Y-%m-%d").to_string(),
            slot_id,
            reason,
        }
    }

    pub fn doctor_id(&self) -> &str {
        &self.doctor_id
    }

    /// `yyyy-MM-dd`.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn slot_id(&self) -> i64 {
        self.slot_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Body for `POST /appointments/`.
    pub fn booking_body(&self) -> Value {
        json!({
            "date": self.date,
            "staff_id": self.doctor_id,
            "slot_id": self.slot_id,
            "reason": self.reason,
        })
    }

    /// Body for `PUT /appointments/{id}/reschedule/`.
    pub fn reschedule_body(&self) -> Value {
        json!({
            "date": self.date,
            "slot_id": self.slot_id,
            "reason": self.reason,
        })
    }
}

// ==============================================================================
// VALIDATION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Doctor,
    Date,
    Slot,
    Reason,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftField::Doctor => write!(f, "doctor"),
            DraftField::Date => write!(f, "date"),
            DraftField::Slot => write!(f, "slot"),
            DraftField::Reason => write!(f, "reason"),
        }
    }
}

/// Local, pre-network rejection of a draft. Names the first failing field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please choose a doctor")]
    MissingDoctor,

    #[error("Please choose a date")]
    MissingDate,

    #[error("The selected date {0} is in the past")]
    DateInPast(NaiveDate),

    #[error("The selected date {date} is more than {horizon_days} days ahead")]
    DateBeyondHorizon { date: NaiveDate, horizon_days: i64 },

    #[error("Please select a time slot")]
    MissingSlot,

    #[error("Time slot {0} is already booked")]
    SlotAlreadyBooked(i64),

    #[error("Please enter a reason for the appointment")]
    EmptyReason,
}

impl ValidationError {
    pub fn field(&self) -> DraftField {
        match self {
            ValidationError::MissingDoctor => DraftField::Doctor,
            ValidationError::MissingDate
            | ValidationError::DateInPast(_)
            | ValidationError::DateBeyondHorizon { .. } => DraftField::Date,
            ValidationError::MissingSlot | ValidationError::SlotAlreadyBooked(_) => DraftField::Slot,
            ValidationError::EmptyReason => DraftField::Reason,
        }
    }
}

// ==============================================================================
// BOOKING OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// `None` for errors not tied to a field.
    pub field: Option<String>,
    pub message: String,
}

/// Backend-side validation errors from a 400 response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    pub const GENERIC_MESSAGE: &'static str = "The appointment request was rejected. Please check your details and try again.";

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: None,
                message: message.into(),
            }],
        }
    }

    pub fn generic() -> Self {
        Self::general(Self::GENERIC_MESSAGE)
    }

    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|error| error.field.as_deref() == Some(field))
            .map(|error| error.message.as_str())
            .collect()
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return Self::GENERIC_MESSAGE.to_string();
        }
        self.errors
            .iter()
            .map(|error| match &error.field {
                Some(field) => format!("{}: {}", field, error.message),
                None => error.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Server-side failure that is neither a validation error nor a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFailure {
    Status { status: u16, detail: Option<String> },
    /// The response did not have the shape the client expects.
    Decoding { status: u16, reason: String },
}

impl ServerFailure {
    pub fn status(&self) -> u16 {
        match self {
            ServerFailure::Status { status, .. } | ServerFailure::Decoding { status, .. } => *status,
        }
    }
}

/// Result of exactly one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Success(i64),
    ValidationFailed(FieldErrors),
    SlotConflict,
    Unauthorized,
    ServerError(ServerFailure),
    NetworkError(String),
}

/// What the host should do after an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirective {
    RefreshAppointmentsAndClose,
    Reauthenticate,
    RefreshSlots,
    Stay,
}

impl BookingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BookingOutcome::Success(_))
    }

    pub fn appointment_id(&self) -> Option<i64> {
        match self {
            BookingOutcome::Success(id) => Some(*id),
            _ => None,
        }
    }

    pub fn directive(&self) -> FlowDirective {
        match self {
            BookingOutcome::Success(_) => FlowDirective::RefreshAppointmentsAndClose,
            BookingOutcome::Unauthorized => FlowDirective::Reauthenticate,
            BookingOutcome::SlotConflict => FlowDirective::RefreshSlots,
            _ => FlowDirective::Stay,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            BookingOutcome::Success(id) => format!("Appointment #{} confirmed", id),
            BookingOutcome::ValidationFailed(errors) => errors.summary(),
            BookingOutcome::SlotConflict => {
                "This time slot is no longer available. Please choose another slot.".to_string()
            }
            BookingOutcome::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            BookingOutcome::ServerError(ServerFailure::Status { status, detail }) => match detail {
                Some(detail) => format!("Server returned status code {}: {}", status, detail),
                None => format!("Server returned status code {}", status),
            },
            BookingOutcome::ServerError(ServerFailure::Decoding { status, .. }) => {
                format!("Unexpected response from server (status code {})", status)
            }
            BookingOutcome::NetworkError(reason) => format!("Network error: {}", reason),
        }
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Appointment {appointment_id} cannot be rescheduled in status {status}")]
    NotReschedulable {
        appointment_id: i64,
        status: AppointmentStatus,
    },

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AppointmentError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(_) => AppointmentError::Unauthorized,
            ApiError::NotFound(_) => AppointmentError::NotFound,
            other => AppointmentError::Api(other),
        }
    }
}
