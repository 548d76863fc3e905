// libs/appointment-cell/src/services/conflict.rs
use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, error, warn};

use shared_client::{HttpReply, TransportError};

use crate::models::{BookingOutcome, FieldError, FieldErrors, ServerFailure};

/// Maps the backend's answer to a booking or reschedule submission onto a
/// `BookingOutcome`.
///
/// | status | outcome |
/// |---|---|
/// | 2xx | `Success` with the `appointment_id` from the body |
/// | 400 | `ValidationFailed` |
/// | 401 | `Unauthorized` |
/// | 409 | `SlotConflict` |
/// | anything else | `ServerError` |
/// | no response | `NetworkError` |
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingConflictResolver {
    fallback_appointment_id: Option<i64>,
}

impl BookingConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reschedule responses may omit `appointment_id`; the rescheduled
    /// appointment keeps its id, so use it when the body does not say.
    pub fn for_reschedule(appointment_id: i64) -> Self {
        Self {
            fallback_appointment_id: Some(appointment_id),
        }
    }

    pub fn resolve(&self, status: u16, body: Option<&[u8]>) -> BookingOutcome {
        let body = body.unwrap_or_default();

        match status {
            200..=299 => self.resolve_success(status, body),
            400 => {
                let errors = decode_validation_errors(body);
                warn!("Submission rejected by backend validation: {}", errors.summary());
                BookingOutcome::ValidationFailed(errors)
            }
            401 => {
                warn!("Submission rejected: credentials no longer valid");
                BookingOutcome::Unauthorized
            }
            409 => {
                warn!("Submission lost the slot to a concurrent booking");
                BookingOutcome::SlotConflict
            }
            _ => {
                let detail = decode_detail(body);
                error!("Submission failed with status {}: {:?}", status, detail);
                BookingOutcome::ServerError(ServerFailure::Status { status, detail })
            }
        }
    }

    /// Resolve the result of a transport call; a missing response is always
    /// `NetworkError`, whatever the cause (timeouts included).
    pub fn resolve_reply(&self, reply: Result<HttpReply, TransportError>) -> BookingOutcome {
        match reply {
            Ok(reply) => self.resolve(reply.status, Some(&reply.body)),
            Err(err) => {
                warn!("Submission got no response: {}", err);
                BookingOutcome::NetworkError(err.to_string())
            }
        }
    }

    /// Only a conflict makes a fresh slot list worth fetching; nothing is
    /// ever resubmitted automatically.
    pub fn should_refresh_slots(outcome: &BookingOutcome) -> bool {
        matches!(outcome, BookingOutcome::SlotConflict)
    }

    fn resolve_success(&self, status: u16, body: &[u8]) -> BookingOutcome {
        #[derive(Deserialize)]
        struct SuccessBody {
            appointment_id: Option<i64>,
        }

        let parsed = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            match serde_json::from_slice::<SuccessBody>(body) {
                Ok(success) => success.appointment_id,
                Err(e) => {
                    return self.fallback_or_decoding_error(status, e.to_string());
                }
            }
        };

        match parsed.or(self.fallback_appointment_id) {
            Some(id) => {
                debug!("Submission accepted, appointment {}", id);
                BookingOutcome::Success(id)
            }
            None => self.fallback_or_decoding_error(status, "missing appointment_id".to_string()),
        }
    }

    fn fallback_or_decoding_error(&self, status: u16, reason: String) -> BookingOutcome {
        match self.fallback_appointment_id {
            Some(id) => {
                warn!("Unreadable success body ({}), assuming appointment {}", reason, id);
                BookingOutcome::Success(id)
            }
            None => {
                error!("Success response without a usable appointment id: {}", reason);
                BookingOutcome::ServerError(ServerFailure::Decoding { status, reason })
            }
        }
    }
}

// ==============================================================================
// ERROR BODY DECODERS
// ==============================================================================

type ErrorDecoder = fn(&[u8]) -> Option<FieldErrors>;

/// Tried in order; the first decoder that recognises the body wins.
const VALIDATION_DECODERS: &[ErrorDecoder] = &[decode_error_string, decode_field_map, decode_message];

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(message) => vec![message],
            OneOrMany::Many(messages) => messages,
        }
    }
}

fn decode_validation_errors(body: &[u8]) -> FieldErrors {
    VALIDATION_DECODERS
        .iter()
        .find_map(|decode| decode(body))
        .unwrap_or_else(|| {
            debug!("Unrecognised 400 body, using generic message");
            FieldErrors::generic()
        })
}

/// `{"error": "..."}`
fn decode_error_string(body: &[u8]) -> Option<FieldErrors> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    non_blank(parsed.error).map(FieldErrors::general)
}

/// `{"errors": {"reason": ["..."], ...}}`
fn decode_field_map(body: &[u8]) -> Option<FieldErrors> {
    #[derive(Deserialize)]
    struct FieldMapBody {
        errors: BTreeMap<String, OneOrMany>,
    }

    let parsed: FieldMapBody = serde_json::from_slice(body).ok()?;
    let errors: Vec<FieldError> = parsed
        .errors
        .into_iter()
        .flat_map(|(field, messages)| {
            let field = (field != "non_field_errors").then_some(field);
            messages
                .into_vec()
                .into_iter()
                .filter_map(non_blank)
                .map(move |message| FieldError {
                    field: field.clone(),
                    message,
                })
        })
        .collect();

    (!errors.is_empty()).then_some(FieldErrors { errors })
}

/// `{"message": "..."}`
fn decode_message(body: &[u8]) -> Option<FieldErrors> {
    decode_message_text(body).map(FieldErrors::general)
}

fn decode_message_text(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct MessageBody {
        message: String,
    }

    let parsed: MessageBody = serde_json::from_slice(body).ok()?;
    non_blank(parsed.message)
}

/// Human-readable detail for non-validation failures, if the body has one.
fn decode_detail(body: &[u8]) -> Option<String> {
    decode_message_text(body)
        .or_else(|| decode_error_string(body).map(|errors| errors.summary()))
        .or_else(|| {
            #[derive(Deserialize)]
            struct DetailBody {
                detail: String,
            }
            serde_json::from_slice::<DetailBody>(body)
                .ok()
                .and_then(|parsed| non_blank(parsed.detail))
        })
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
