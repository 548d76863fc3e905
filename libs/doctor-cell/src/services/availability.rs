// libs/doctor-cell/src/services/availability.rs

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, warn};

use crate::models::{Slot, SlotAvailability};

/// Decides which of a doctor's slots can still be offered for booking.
///
/// Pure: the result depends only on the slot list, the evaluated date and the
/// supplied "now". Time-of-day comparison is at minute granularity and a slot
/// starting in the current minute counts as passed.
pub struct SlotAvailabilityFilter;

impl SlotAvailabilityFilter {
    /// Selectable slots for `date` as of `now`.
    pub fn available_slots(all_slots: &[Slot], date: NaiveDate, now: NaiveDateTime) -> Vec<Slot> {
        Self::filter(all_slots, date, now).available
    }

    /// Same as [`available_slots`](Self::available_slots), also reporting slots
    /// whose start time could not be parsed (these are kept, not hidden).
    pub fn filter(all_slots: &[Slot], date: NaiveDate, now: NaiveDateTime) -> SlotAvailability {
        let today = now.date();
        let mut result = SlotAvailability::default();

        if date < today {
            debug!("Date {} has already elapsed, no slots offered", date);
            return result;
        }

        let cutoff = (date == today).then(|| truncate_to_minute(now.time()));

        for slot in all_slots.iter().filter(|slot| !slot.booked) {
            let Some(cutoff) = cutoff else {
                result.available.push(slot.clone());
                continue;
            };

            match slot.start_hour_minute() {
                Some(start) if start <= cutoff => {
                    debug!("Slot {} at {} has passed", slot.id, slot.start_time);
                }
                Some(_) => result.available.push(slot.clone()),
                None => {
                    warn!(
                        "Slot {} has unparseable start time '{}', keeping it selectable",
                        slot.id, slot.start_time
                    );
                    result.unparseable.push(slot.id);
                    result.available.push(slot.clone());
                }
            }
        }

        debug!(
            "{} of {} slots available for {}",
            result.available.len(),
            all_slots.len(),
            date
        );

        result
    }

    /// Whether a single slot has elapsed. `None` when its start time is unparseable.
    pub fn has_passed(slot: &Slot, date: NaiveDate, now: NaiveDateTime) -> Option<bool> {
        let today = now.date();
        if date < today {
            return Some(true);
        }
        if date > today {
            return Some(false);
        }
        slot.start_hour_minute()
            .map(|start| start <= truncate_to_minute(now.time()))
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
