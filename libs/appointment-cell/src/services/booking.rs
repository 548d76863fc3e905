// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info};

use shared_client::{HospitalApiClient, HttpReply, TransportError};
use shared_config::AppConfig;
use shared_models::CredentialProvider;

use crate::models::{Appointment, AppointmentError, AppointmentRequest, BookingOutcome, FlowMode};
use crate::services::conflict::BookingConflictResolver;

/// Write side of the appointments API. Submissions return the raw reply so
/// the caller can classify it with [`BookingConflictResolver`].
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn book(&self, request: &AppointmentRequest) -> Result<HttpReply, TransportError>;

    async fn reschedule(
        &self,
        appointment_id: i64,
        request: &AppointmentRequest,
    ) -> Result<HttpReply, TransportError>;
}

/// Send `request` through `gateway` as a booking or a reschedule, depending
/// on `mode`, and classify the reply. Exactly one call, never retried.
pub async fn submit_via(
    gateway: &dyn AppointmentGateway,
    mode: &FlowMode,
    request: &AppointmentRequest,
) -> BookingOutcome {
    match mode {
        FlowMode::Book { .. } => BookingConflictResolver::new().resolve_reply(gateway.book(request).await),
        FlowMode::Reschedule { appointment_id, .. } => BookingConflictResolver::for_reschedule(*appointment_id)
            .resolve_reply(gateway.reschedule(*appointment_id, request).await),
    }
}

pub struct AppointmentBookingService {
    client: Arc<HospitalApiClient>,
}

impl AppointmentBookingService {
    pub fn new(client: Arc<HospitalApiClient>) -> Self {
        Self { client }
    }

    pub fn from_config(
        config: &AppConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AppointmentError> {
        let client = HospitalApiClient::new(config, credentials)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Submit once and classify the reply.
    pub async fn submit(&self, mode: &FlowMode, request: &AppointmentRequest) -> BookingOutcome {
        submit_via(self, mode, request).await
    }

    /// The signed-in patient's appointments, newest first.
    pub async fn appointment_history(&self) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointment history");

        let mut appointments: Vec<Appointment> = self
            .client
            .request(Method::GET, "/appointments/history/", None)
            .await?;

        appointments.sort_by(|a, b| b.appointment_id.cmp(&a.appointment_id));
        debug!("Loaded {} appointments", appointments.len());

        Ok(appointments)
    }

    pub async fn upcoming_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointment_history().await?;
        Ok(appointments.into_iter().filter(Appointment::is_upcoming).collect())
    }
}

#[async_trait]
impl AppointmentGateway for AppointmentBookingService {
    async fn book(&self, request: &AppointmentRequest) -> Result<HttpReply, TransportError> {
        info!(
            "Booking slot {} with doctor {} on {}",
            request.slot_id(),
            request.doctor_id(),
            request.date()
        );

        self.client
            .send(Method::POST, "/appointments/", Some(request.booking_body()))
            .await
    }

    async fn reschedule(
        &self,
        appointment_id: i64,
        request: &AppointmentRequest,
    ) -> Result<HttpReply, TransportError> {
        info!(
            "Rescheduling appointment {} to slot {} on {}",
            appointment_id,
            request.slot_id(),
            request.date()
        );

        let path = format!("/appointments/{}/reschedule/", appointment_id);
        self.client
            .send(Method::PUT, &path, Some(request.reschedule_body()))
            .await
    }
}
