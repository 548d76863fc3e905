use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BOOKING_HORIZON_DAYS: i64 = 90;
pub const MAX_BOOKING_HORIZON_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub booking_horizon_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            booking_horizon_days: DEFAULT_BOOKING_HORIZON_DAYS,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and then read the environment.
    pub fn load() -> Self {
        dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("HOSPITAL_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("HOSPITAL_API_BASE_URL not set, using empty value");
                    String::new()
                }),
            request_timeout_secs: parse_in_range(
                "HOSPITAL_API_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
                1..=u64::MAX,
            ),
            booking_horizon_days: parse_in_range(
                "BOOKING_HORIZON_DAYS",
                DEFAULT_BOOKING_HORIZON_DAYS,
                1..=MAX_BOOKING_HORIZON_DAYS,
            ),
        };

        if !config.is_configured() {
            warn!("Booking client not fully configured - missing environment variables");
        }

        config
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse `key`, falling back to `default` when it is unset, unparseable or
/// outside `range`.
fn parse_in_range<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: std::str::FromStr + std::fmt::Display + PartialOrd + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if range.contains(&value) => value,
            Ok(value) => {
                warn!(
                    "{} value {} is outside {}..={}, using default {}",
                    key,
                    value,
                    range.start(),
                    range.end(),
                    default
                );
                default
            }
            Err(_) => {
                warn!("{} has invalid value '{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
