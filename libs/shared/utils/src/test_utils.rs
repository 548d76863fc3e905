use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::{CredentialProvider, StaticCredentials};

pub struct TestConfig {
    pub api_base_url: String,
    pub access_token: String,
    pub booking_horizon_days: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/hospital/general".to_string(),
            access_token: "test-access-token".to_string(),
            booking_horizon_days: 90,
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            request_timeout_secs: 5,
            booking_horizon_days: self.booking_horizon_days,
        }
    }

    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredentials::new(self.access_token.clone()))
    }
}

/// `NaiveDateTime` literal helper for fixtures. Panics on an invalid date,
/// which is a bug in the test itself.
pub fn local_time(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| panic!("invalid fixture time {:02}:{:02}", hour, minute))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{}", year, month, day))
}

pub struct MockHospitalResponses;

impl MockHospitalResponses {
    pub fn doctor_response(staff_id: &str, name: &str, specialization: &str) -> Value {
        json!({
            "staff_id": staff_id,
            "staff_name": name,
            "specialization": specialization,
            "doctor_type": "General",
            "on_leave": false
        })
    }

    pub fn slot_response(slot_id: i64, start: &str, is_booked: bool) -> Value {
        json!({
            "slot_id": slot_id,
            "slot_start_time": start,
            "slot_duration": 30,
            "is_booked": is_booked
        })
    }

    pub fn booking_success(appointment_id: i64) -> Value {
        json!({
            "message": "Appointment booked successfully",
            "appointment_id": appointment_id
        })
    }

    pub fn reschedule_success(appointment_id: i64, new_date: &str, new_slot_id: i64) -> Value {
        json!({
            "message": "Appointment rescheduled successfully",
            "appointment_id": appointment_id,
            "new_date": new_date,
            "new_slot_id": new_slot_id
        })
    }

    pub fn appointment_response(appointment_id: i64, date: &str, slot_id: i64, staff_id: &str, status: &str) -> Value {
        json!({
            "appointment_id": appointment_id,
            "date": date,
            "slot_id": slot_id,
            "staff_id": staff_id,
            "patient_id": 1,
            "status": status,
            "reason": "Follow-up"
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "error": message })
    }

    pub fn field_errors_response(field: &str, messages: &[&str]) -> Value {
        json!({ "errors": { field: messages } })
    }
}
