// libs/appointment-cell/src/services/request_builder.rs
use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use crate::models::{AppointmentDraft, AppointmentRequest, ValidationError};

/// Turns a draft into a submittable request, checking one field at a time in
/// the order doctor, date, slot, reason and stopping at the first failure.
#[derive(Debug, Clone, Copy)]
pub struct AppointmentRequestBuilder {
    today: NaiveDate,
    horizon_days: Option<i64>,
}

impl AppointmentRequestBuilder {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            horizon_days: None,
        }
    }

    /// Reject dates further than `days` after today. A negative horizon is
    /// ignored.
    pub fn with_horizon(mut self, days: i64) -> Self {
        if days < 0 {
            warn!("Ignoring negative booking horizon of {} days", days);
            self.horizon_days = None;
        } else {
            self.horizon_days = Some(days);
        }
        self
    }

    pub fn build(&self, draft: &AppointmentDraft) -> Result<AppointmentRequest, ValidationError> {
        let doctor_id = draft
            .doctor_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingDoctor)?;

        let date = draft.date.ok_or(ValidationError::MissingDate)?;
        self.check_date(date)?;

        let slot = draft.slot.as_ref().ok_or(ValidationError::MissingSlot)?;
        if slot.booked {
            return Err(ValidationError::SlotAlreadyBooked(slot.id));
        }

        let reason = draft.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyReason);
        }

        debug!("Draft valid: doctor {} on {} slot {}", doctor_id, date, slot.id);

        Ok(AppointmentRequest::new(
            doctor_id.to_string(),
            date,
            slot.id,
            reason.to_string(),
        ))
    }

    fn check_date(&self, date: NaiveDate) -> Result<(), ValidationError> {
        // Date-only comparison: a same-day booking is valid here, elapsed
        // slots on today are the availability filter's concern.
        if date < self.today {
            return Err(ValidationError::DateInPast(date));
        }

        if let Some(horizon_days) = self.horizon_days {
            // A horizon that runs past the calendar's end is no bound at all.
            let last_day = u64::try_from(horizon_days)
                .ok()
                .and_then(|days| self.today.checked_add_days(Days::new(days)));

            if last_day.is_some_and(|last_day| date > last_day) {
                return Err(ValidationError::DateBeyondHorizon { date, horizon_days });
            }
        }

        Ok(())
    }
}
