// libs/doctor-cell/src/services/doctor.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use tracing::debug;

use shared_client::HospitalApiClient;
use shared_config::AppConfig;
use shared_models::{ApiError, CredentialProvider};

use crate::models::{DoctorSummary, Slot};

/// Read side of the doctor directory consumed by the booking flow.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn doctor_summary(&self, doctor_id: &str) -> Result<DoctorSummary>;

    /// Every slot the backend lists for the doctor on `date`, booked or not.
    async fn doctor_slots(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<Slot>>;
}

pub struct DoctorService {
    client: Arc<HospitalApiClient>,
}

impl DoctorService {
    pub fn new(client: Arc<HospitalApiClient>) -> Self {
        Self { client }
    }

    pub fn from_config(config: &AppConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = HospitalApiClient::new(config, credentials)
            .context("failed to build hospital API client")?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl DoctorDirectory for DoctorService {
    async fn doctor_summary(&self, doctor_id: &str) -> Result<DoctorSummary> {
        debug!("Fetching doctor summary for {}", doctor_id);

        let path = format!("/doctors/{}/", urlencoding::encode(doctor_id));
        let doctor: DoctorSummary = self
            .client
            .request(Method::GET, &path, None)
            .await
            .with_context(|| format!("failed to load doctor {}", doctor_id))?;

        Ok(doctor)
    }

    async fn doctor_slots(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<Slot>> {
        let date_str = date.format("%Y-%m-%d").to_string();
        debug!("Fetching slots for doctor {} on {}", doctor_id, date_str);

        let path = format!(
            "/doctors/{}/slots/?date={}",
            urlencoding::encode(doctor_id),
            date_str
        );
        let slots: Vec<Slot> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .with_context(|| format!("failed to load slots for doctor {} on {}", doctor_id, date_str))?;

        debug!("Doctor {} has {} slots on {}", doctor_id, slots.len(), date_str);
        Ok(slots)
    }
}

/// Whether a directory failure was the backend rejecting our credentials.
pub fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ApiError>())
        .any(ApiError::is_unauthorized)
}
