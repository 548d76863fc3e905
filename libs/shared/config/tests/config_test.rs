use std::env;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shared_config::{
    AppConfig, DEFAULT_BOOKING_HORIZON_DAYS, DEFAULT_TIMEOUT_SECS, MAX_BOOKING_HORIZON_DAYS,
};

const VARS: [&str; 3] = [
    "HOSPITAL_API_BASE_URL",
    "HOSPITAL_API_TIMEOUT_SECS",
    "BOOKING_HORIZON_DAYS",
];

// Tests in this file share the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn with_env(vars: &[(&str, &str)]) -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    for key in VARS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }
    guard
}

#[test]
fn default_config_is_not_configured() {
    let config = AppConfig::default();

    assert!(!config.is_configured());
    assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.booking_horizon_days, DEFAULT_BOOKING_HORIZON_DAYS);
}

#[test]
fn base_url_marks_config_as_configured() {
    let config = AppConfig::with_base_url("http://localhost:8000/hospital/general");

    assert!(config.is_configured());
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
}

#[test]
fn from_env_reads_all_variables() {
    let _env = with_env(&[
        ("HOSPITAL_API_BASE_URL", "http://localhost:8000/hospital/general/"),
        ("HOSPITAL_API_TIMEOUT_SECS", " 12 "),
        ("BOOKING_HORIZON_DAYS", "30"),
    ]);

    let config = AppConfig::from_env();

    assert_eq!(config.api_base_url, "http://localhost:8000/hospital/general");
    assert!(config.is_configured());
    assert_eq!(config.request_timeout(), Duration::from_secs(12));
    assert_eq!(config.booking_horizon_days, 30);
}

#[test]
fn from_env_falls_back_on_missing_or_invalid_values() {
    let _env = with_env(&[
        ("HOSPITAL_API_BASE_URL", "http://localhost:8000/"),
        ("HOSPITAL_API_TIMEOUT_SECS", "soon"),
    ]);

    let config = AppConfig::from_env();

    assert_eq!(config.api_base_url, "http://localhost:8000");
    assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.booking_horizon_days, DEFAULT_BOOKING_HORIZON_DAYS);
}

#[test]
fn from_env_without_base_url_is_not_configured() {
    let _env = with_env(&[]);

    let config = AppConfig::from_env();

    assert!(!config.is_configured());
    assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
}

#[test]
fn from_env_rejects_out_of_range_horizon() {
    for raw in ["0", "-1", "100000000", "9223372036854775807"] {
        let _env = with_env(&[("BOOKING_HORIZON_DAYS", raw)]);

        let config = AppConfig::from_env();

        assert_eq!(
            config.booking_horizon_days, DEFAULT_BOOKING_HORIZON_DAYS,
            "horizon {} should fall back",
            raw
        );
    }

    let max = MAX_BOOKING_HORIZON_DAYS.to_string();
    let _env = with_env(&[("BOOKING_HORIZON_DAYS", max.as_str())]);
    assert_eq!(AppConfig::from_env().booking_horizon_days, MAX_BOOKING_HORIZON_DAYS);
}

#[test]
fn from_env_rejects_zero_timeout() {
    let _env = with_env(&[("HOSPITAL_API_TIMEOUT_SECS", "0")]);

    assert_eq!(AppConfig::from_env().request_timeout_secs, DEFAULT_TIMEOUT_SECS);
}
