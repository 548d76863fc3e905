// libs/appointment-cell/tests/common/mod.rs
//
// In-memory doctor directory and appointment gateway for driving the
// lifecycle controller without a backend.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Notify;

use appointment_cell::models::{AppointmentRequest, FlowMode};
use appointment_cell::services::{AppointmentGateway, AppointmentLifecycleController};
use doctor_cell::models::{DoctorSummary, Slot};
use doctor_cell::services::DoctorDirectory;
use shared_client::{HttpReply, TransportError};
use shared_models::ApiError;
use shared_utils::telemetry::init_tracing_with;
use shared_utils::test_utils::{date, local_time};
use shared_utils::FixedClock;

pub const DOCTOR_ID: &str = "D1";

pub fn today() -> NaiveDate {
    date(2024, 5, 20)
}

pub fn clock_at(hour: u32, minute: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(local_time(today(), hour, minute)))
}

pub fn doctor() -> DoctorSummary {
    DoctorSummary {
        staff_id: DOCTOR_ID.to_string(),
        staff_name: "Dr. Rao".to_string(),
        specialization: "Cardiology".to_string(),
        doctor_type: "General".to_string(),
        on_leave: false,
    }
}

pub fn reply(status: u16, body: Value) -> Result<HttpReply, TransportError> {
    Ok(HttpReply {
        status,
        body: body.to_string().into_bytes(),
    })
}

/// Poll until `condition` holds; panics after ~2s.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

#[derive(Default)]
pub struct FakeDirectory {
    doctor: Mutex<Option<DoctorSummary>>,
    slots: Mutex<HashMap<NaiveDate, Vec<Slot>>>,
    unauthorized: Mutex<bool>,
    gates: Mutex<HashMap<NaiveDate, Arc<Notify>>>,
    slot_requests: Mutex<Vec<NaiveDate>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        let directory = Self::default();
        directory.set_doctor(Some(doctor()));
        directory
    }

    pub fn set_doctor(&self, doctor: Option<DoctorSummary>) {
        *self.doctor.lock().unwrap() = doctor;
    }

    pub fn set_slots(&self, date: NaiveDate, slots: Vec<Slot>) {
        self.slots.lock().unwrap().insert(date, slots);
    }

    pub fn reject_credentials(&self) {
        *self.unauthorized.lock().unwrap() = true;
    }

    /// Hold slot responses for `date` until the returned handle is notified.
    pub fn gate(&self, date: NaiveDate) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(date, Arc::clone(&notify));
        notify
    }

    pub fn slot_requests(&self) -> Vec<NaiveDate> {
        self.slot_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DoctorDirectory for FakeDirectory {
    async fn doctor_summary(&self, doctor_id: &str) -> anyhow::Result<DoctorSummary> {
        let doctor = self.doctor.lock().unwrap().clone();
        doctor.ok_or_else(|| anyhow!("doctor {} not found", doctor_id))
    }

    async fn doctor_slots(&self, _doctor_id: &str, date: NaiveDate) -> anyhow::Result<Vec<Slot>> {
        self.slot_requests.lock().unwrap().push(date);

        let gate = self.gates.lock().unwrap().get(&date).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.unauthorized.lock().unwrap() {
            return Err(anyhow::Error::new(ApiError::Unauthorized("expired".to_string()))
                .context("failed to load slots"));
        }

        Ok(self.slots.lock().unwrap().get(&date).cloned().unwrap_or_default())
    }
}

// ==============================================================================
// APPOINTMENT GATEWAY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub appointment_id: Option<i64>,
    pub request: AppointmentRequest,
}

#[derive(Default)]
pub struct FakeGateway {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    submissions: Mutex<Vec<RecordedSubmission>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<HttpReply, TransportError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Hold every submission until the returned handle is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    async fn record(&self, appointment_id: Option<i64>, request: &AppointmentRequest) -> Result<HttpReply, TransportError> {
        self.submissions.lock().unwrap().push(RecordedSubmission {
            appointment_id,
            request: request.clone(),
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| reply(201, serde_json::json!({"appointment_id": 1})))
    }
}

#[async_trait]
impl AppointmentGateway for FakeGateway {
    async fn book(&self, request: &AppointmentRequest) -> Result<HttpReply, TransportError> {
        self.record(None, request).await
    }

    async fn reschedule(&self, appointment_id: i64, request: &AppointmentRequest) -> Result<HttpReply, TransportError> {
        self.record(Some(appointment_id), request).await
    }
}

// ==============================================================================
// HARNESS
// ==============================================================================

pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub gateway: Arc<FakeGateway>,
    pub clock: Arc<FixedClock>,
    pub controller: Arc<AppointmentLifecycleController>,
}

impl Harness {
    pub fn new(mode: FlowMode, clock: Arc<FixedClock>) -> Self {
        let directory = Arc::new(FakeDirectory::new());
        let gateway = Arc::new(FakeGateway::new());
        Self::with_parts(mode, directory, gateway, clock)
    }

    pub fn with_parts(
        mode: FlowMode,
        directory: Arc<FakeDirectory>,
        gateway: Arc<FakeGateway>,
        clock: Arc<FixedClock>,
    ) -> Self {
        init_tracing_with("appointment_cell=debug");

        let controller = Arc::new(AppointmentLifecycleController::new(
            mode,
            directory.clone(),
            gateway.clone(),
            clock.clone(),
        ));

        Self {
            directory,
            gateway,
            clock,
            controller,
        }
    }

    pub fn booking(clock: Arc<FixedClock>) -> Self {
        Self::new(FlowMode::book(DOCTOR_ID), clock)
    }
}
