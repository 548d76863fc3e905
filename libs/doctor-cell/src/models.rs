use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

// ==============================================================================
// DOCTOR DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub staff_id: String,
    pub staff_name: String,
    pub specialization: String,
    #[serde(default)]
    pub doctor_type: String,
    #[serde(default)]
    pub on_leave: bool,
}

impl DoctorSummary {
    pub fn display_name(&self) -> String {
        if self.specialization.is_empty() {
            self.staff_name.clone()
        } else {
            format!("{} ({})", self.staff_name, self.specialization)
        }
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// One bookable time unit on a doctor's calendar for a single date.
///
/// `start_time` is kept as the backend's raw `HH:mm:ss` string: a malformed
/// value must still be representable so the availability filter can fail open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(rename = "slot_id")]
    pub id: i64,
    #[serde(rename = "slot_start_time")]
    pub start_time: String,
    #[serde(rename = "slot_duration")]
    pub duration_minutes: i32,
    #[serde(rename = "is_booked")]
    pub booked: bool,
}

impl Slot {
    pub fn new(id: i64, start_time: impl Into<String>, duration_minutes: i32, booked: bool) -> Self {
        Self {
            id,
            start_time: start_time.into(),
            duration_minutes,
            booked,
        }
    }

    /// Start time truncated to the minute, or `None` when the string has no
    /// parseable hour and minute.
    pub fn start_hour_minute(&self) -> Option<NaiveTime> {
        let mut parts = self.start_time.trim().split(':');
        let hour = parts.next()?.trim().parse::<u32>().ok()?;
        let minute = parts.next()?.trim().parse::<u32>().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    /// `HH:MM` label for display; falls back to the raw string.
    pub fn label(&self) -> String {
        match self.start_hour_minute() {
            Some(time) => format!("{:02}:{:02}", time.hour(), time.minute()),
            None => self.start_time.clone(),
        }
    }
}

/// Result of filtering a slot listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAvailability {
    pub available: Vec<Slot>,
    /// Slots kept despite an unparseable start time.
    pub unparseable: Vec<i64>,
}

impl SlotAvailability {
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn contains(&self, slot_id: i64) -> bool {
        self.available.iter().any(|slot| slot.id == slot_id)
    }
}
