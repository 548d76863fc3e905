// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorSummary, Slot, SlotAvailability};
use doctor_cell::services::{is_unauthorized, DoctorDirectory, DoctorService, SlotAvailabilityFilter};
use shared_client::HospitalApiClient;
use shared_config::{AppConfig, DEFAULT_BOOKING_HORIZON_DAYS};
use shared_models::CredentialProvider;
use shared_utils::{Clock, SystemClock};

use crate::models::{AppointmentDraft, BookingOutcome, FlowMode, ValidationError};
use crate::services::booking::{submit_via, AppointmentBookingService, AppointmentGateway};
use crate::services::request_builder::AppointmentRequestBuilder;

// ==============================================================================
// FLOW STATE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    LoadingContext,
    Ready,
    Submitting,
    Succeeded { appointment_id: i64 },
    Cancelled,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Succeeded { .. } | FlowState::Cancelled)
    }
}

/// Message the UI should show after the last user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowNotice {
    Invalid(ValidationError),
    SlotConflict,
    SubmissionFailed(BookingOutcome),
}

impl FlowNotice {
    pub fn message(&self) -> String {
        match self {
            FlowNotice::Invalid(error) => error.to_string(),
            FlowNotice::SlotConflict => BookingOutcome::SlotConflict.user_message(),
            FlowNotice::SubmissionFailed(outcome) => outcome.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub draft: AppointmentDraft,
    pub doctor: Option<DoctorSummary>,
    pub doctor_error: Option<String>,
    pub available_slots: Vec<Slot>,
    pub unparseable_slots: Vec<i64>,
    pub slots_loading: bool,
    pub slots_error: Option<String>,
    pub notice: Option<FlowNotice>,
    pub reauthentication_required: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("Booking flow is not ready (state: {0:?})")]
    NotReady(FlowState),

    #[error("Booking flow has been closed")]
    Closed,

    #[error("Time slot {0} is not available for selection")]
    SlotNotAvailable(i64),
}

struct FlowInner {
    state: FlowState,
    draft: AppointmentDraft,
    doctor: Option<DoctorSummary>,
    doctor_error: Option<String>,
    slots: SlotAvailability,
    slots_loading: bool,
    slots_error: Option<String>,
    /// Bumped on every slot fetch; a response whose ticket is no longer
    /// current is discarded.
    slot_ticket: u64,
    notice: Option<FlowNotice>,
    reauthentication_required: bool,
}

impl FlowInner {
    fn begin_slot_fetch(&mut self) -> u64 {
        self.slot_ticket += 1;
        self.slots = SlotAvailability::default();
        self.slots_loading = true;
        self.slots_error = None;
        self.slot_ticket
    }
}

// ==============================================================================
// CONTROLLER
// ==============================================================================

/// Drives one booking or reschedule attempt:
/// `Idle -> LoadingContext -> Ready -> Submitting -> Succeeded`, returning to
/// `Ready` after any failed submission. `Succeeded` and `Cancelled` are terminal.
///
/// One instance per attempt. Methods take `&self`, so an instance can be
/// shared (e.g. in an `Arc`) between the UI and spawned tasks; state is only
/// touched under the internal lock, which is never held across a network call.
pub struct AppointmentLifecycleController {
    flow_id: Uuid,
    mode: FlowMode,
    directory: Arc<dyn DoctorDirectory>,
    gateway: Arc<dyn AppointmentGateway>,
    clock: Arc<dyn Clock>,
    horizon_days: i64,
    inner: Mutex<FlowInner>,
}

impl AppointmentLifecycleController {
    pub fn new(
        mode: FlowMode,
        directory: Arc<dyn DoctorDirectory>,
        gateway: Arc<dyn AppointmentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let draft = AppointmentDraft::for_mode(&mode, mode.initial_date(clock.today()));

        Self {
            flow_id: Uuid::new_v4(),
            mode,
            directory,
            gateway,
            clock,
            horizon_days: DEFAULT_BOOKING_HORIZON_DAYS,
            inner: Mutex::new(FlowInner {
                state: FlowState::Idle,
                draft,
                doctor: None,
                doctor_error: None,
                slots: SlotAvailability::default(),
                slots_loading: false,
                slots_error: None,
                slot_ticket: 0,
                notice: None,
                reauthentication_required: false,
            }),
        }
    }

    /// Controller backed by the HTTP services, with the system clock.
    pub fn connect(
        config: &AppConfig,
        credentials: Arc<dyn CredentialProvider>,
        mode: FlowMode,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(HospitalApiClient::new(config, credentials)?);
        let directory = Arc::new(DoctorService::new(Arc::clone(&client)));
        let gateway = Arc::new(AppointmentBookingService::new(client));

        Ok(Self::new(mode, directory, gateway, Arc::new(SystemClock))
            .with_booking_horizon(config.booking_horizon_days))
    }

    pub fn with_booking_horizon(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn mode(&self) -> &FlowMode {
        &self.mode
    }

    pub async fn state(&self) -> FlowState {
        self.inner.lock().await.state.clone()
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let inner = self.inner.lock().await;
        FlowSnapshot {
            state: inner.state.clone(),
            draft: inner.draft.clone(),
            doctor: inner.doctor.clone(),
            doctor_error: inner.doctor_error.clone(),
            available_slots: inner.slots.available.clone(),
            unparseable_slots: inner.slots.unparseable.clone(),
            slots_loading: inner.slots_loading,
            slots_error: inner.slots_error.clone(),
            notice: inner.notice.clone(),
            reauthentication_required: inner.reauthentication_required,
        }
    }

    /// Load the doctor and the initial slot list concurrently. A doctor
    /// failure only degrades the header; slots stay selectable.
    pub async fn open(&self) -> Result<(), FlowError> {
        let (date, ticket) = {
            let mut inner = self.inner.lock().await;
            if inner.state != FlowState::Idle {
                return Err(FlowError::NotReady(inner.state.clone()));
            }
            inner.state = FlowState::LoadingContext;
            let date = inner.draft.date.unwrap_or_else(|| self.mode.initial_date(self.clock.today()));
            inner.draft.set_date(date);
            (date, inner.begin_slot_fetch())
        };

        let doctor_id = self.mode.doctor_id();
        info!(flow_id = %self.flow_id, "Opening flow for doctor {} on {}", doctor_id, date);

        let (doctor, slots) = futures::join!(
            self.directory.doctor_summary(doctor_id),
            self.directory.doctor_slots(doctor_id, date),
        );

        let mut inner = self.inner.lock().await;
        if inner.state != FlowState::LoadingContext {
            debug!(flow_id = %self.flow_id, "Flow closed while loading, discarding context");
            return Err(FlowError::Closed);
        }

        match doctor {
            Ok(doctor) => inner.doctor = Some(doctor),
            Err(err) => {
                warn!(flow_id = %self.flow_id, "Doctor details unavailable: {:#}", err);
                inner.reauthentication_required |= is_unauthorized(&err);
                inner.doctor_error = Some(format!("{:#}", err));
            }
        }
        self.apply_slots(&mut inner, date, ticket, slots);
        inner.state = FlowState::Ready;

        info!(flow_id = %self.flow_id, "Flow ready with {} available slots", inner.slots.available.len());
        Ok(())
    }

    /// Switch to another date: clears the selected slot and loads that date's
    /// slots. A response for a date that is no longer selected is dropped.
    pub async fn select_date(&self, date: NaiveDate) -> Result<(), FlowError> {
        let ticket = {
            let mut inner = self.inner.lock().await;
            Self::ensure_ready(&inner)?;
            inner.draft.set_date(date);
            inner.draft.clear_slot();
            inner.notice = None;
            inner.begin_slot_fetch()
        };

        self.fetch_slots(date, ticket).await
    }

    pub async fn select_slot(&self, slot_id: i64) -> Result<Slot, FlowError> {
        let mut inner = self.inner.lock().await;
        Self::ensure_ready(&inner)?;

        let slot = inner
            .slots
            .available
            .iter()
            .find(|slot| slot.id == slot_id)
            .cloned()
            .ok_or(FlowError::SlotNotAvailable(slot_id))?;

        debug!(flow_id = %self.flow_id, "Selected slot {} at {}", slot.id, slot.start_time);
        inner.draft.select_slot(slot.clone());
        inner.notice = None;
        Ok(slot)
    }

    pub async fn set_reason(&self, reason: impl Into<String>) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        match &inner.state {
            FlowState::Submitting => return Err(FlowError::SubmissionInFlight),
            state if state.is_terminal() => return Err(FlowError::Closed),
            _ => {}
        }
        inner.draft.set_reason(reason);
        Ok(())
    }

    /// Validate and submit the draft once.
    ///
    /// Invalid drafts never reach the network. While a submission is in flight
    /// further calls fail with `SubmissionInFlight`. A conflict refreshes the
    /// slot list for the current date before returning; no outcome is retried.
    pub async fn submit(&self) -> Result<BookingOutcome, FlowError> {
        let request = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                FlowState::Ready => {}
                FlowState::Submitting => return Err(FlowError::SubmissionInFlight),
                state if state.is_terminal() => return Err(FlowError::Closed),
                state => return Err(FlowError::NotReady(state.clone())),
            }

            let builder = AppointmentRequestBuilder::new(self.clock.today()).with_horizon(self.horizon_days);
            let built = builder.build(&inner.draft);
            match built {
                Ok(request) => {
                    inner.state = FlowState::Submitting;
                    inner.notice = None;
                    request
                }
                Err(err) => {
                    debug!(flow_id = %self.flow_id, "Draft rejected locally: {}", err);
                    inner.notice = Some(FlowNotice::Invalid(err.clone()));
                    return Err(err.into());
                }
            }
        };

        info!(flow_id = %self.flow_id, "Submitting slot {} on {}", request.slot_id(), request.date());

        let outcome = submit_via(self.gateway.as_ref(), &self.mode, &request).await;

        let refresh = {
            let mut inner = self.inner.lock().await;
            if inner.state != FlowState::Submitting {
                info!(flow_id = %self.flow_id, "Flow closed during submission, discarding outcome: {}", outcome);
                return Err(FlowError::Closed);
            }
            self.apply_outcome(&mut inner, &outcome)
        };

        if let Some((date, ticket)) = refresh {
            // Outcome is already decided; a failed refresh only shows up in
            // the snapshot's slot error.
            if let Err(err) = self.fetch_slots(date, ticket).await {
                debug!(flow_id = %self.flow_id, "Slot refresh after conflict skipped: {}", err);
            }
        }

        Ok(outcome)
    }

    /// Abandon the flow. In-flight requests complete but their results are dropped.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            return;
        }
        info!(flow_id = %self.flow_id, "Flow cancelled in state {:?}", inner.state);
        inner.state = FlowState::Cancelled;
        inner.slot_ticket += 1;
        inner.slots_loading = false;
    }

    // --------------------------------------------------------------------------

    fn ensure_ready(inner: &FlowInner) -> Result<(), FlowError> {
        match &inner.state {
            FlowState::Ready => Ok(()),
            FlowState::Submitting => Err(FlowError::SubmissionInFlight),
            state if state.is_terminal() => Err(FlowError::Closed),
            state => Err(FlowError::NotReady(state.clone())),
        }
    }

    /// Returns the slot refetch to run, if any.
    fn apply_outcome(&self, inner: &mut FlowInner, outcome: &BookingOutcome) -> Option<(NaiveDate, u64)> {
        match outcome {
            BookingOutcome::Success(appointment_id) => {
                info!(flow_id = %self.flow_id, "Appointment {} confirmed", appointment_id);
                inner.state = FlowState::Succeeded {
                    appointment_id: *appointment_id,
                };
                inner.notice = None;
                None
            }
            BookingOutcome::SlotConflict => {
                warn!(flow_id = %self.flow_id, "Selected slot was taken, refreshing slots");
                inner.state = FlowState::Ready;
                inner.draft.clear_slot();
                inner.notice = Some(FlowNotice::SlotConflict);
                let date = inner.draft.date?;
                Some((date, inner.begin_slot_fetch()))
            }
            other => {
                warn!(flow_id = %self.flow_id, "Submission failed: {}", other);
                inner.state = FlowState::Ready;
                inner.reauthentication_required |= matches!(other, BookingOutcome::Unauthorized);
                inner.notice = Some(FlowNotice::SubmissionFailed(other.clone()));
                None
            }
        }
    }

    async fn fetch_slots(&self, date: NaiveDate, ticket: u64) -> Result<(), FlowError> {
        let result = self.directory.doctor_slots(self.mode.doctor_id(), date).await;

        let mut inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            debug!(flow_id = %self.flow_id, "Flow closed, discarding slots for {}", date);
            return Err(FlowError::Closed);
        }
        self.apply_slots(&mut inner, date, ticket, result);
        Ok(())
    }

    fn apply_slots(
        &self,
        inner: &mut FlowInner,
        date: NaiveDate,
        ticket: u64,
        result: anyhow::Result<Vec<Slot>>,
    ) -> bool {
        if ticket != inner.slot_ticket || inner.draft.date != Some(date) {
            warn!(flow_id = %self.flow_id, "Discarding stale slot response for {}", date);
            return false;
        }

        inner.slots_loading = false;
        match result {
            Ok(all_slots) => {
                inner.slots = SlotAvailabilityFilter::filter(&all_slots, date, self.clock.now());
                inner.slots_error = None;
            }
            Err(err) => {
                warn!(flow_id = %self.flow_id, "Slots for {} unavailable: {:#}", date, err);
                inner.reauthentication_required |= is_unauthorized(&err);
                inner.slots = SlotAvailability::default();
                inner.slots_error = Some(format!("{:#}", err));
            }
        }
        true
    }
}
