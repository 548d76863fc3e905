pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod request_builder;

pub use booking::{submit_via, AppointmentBookingService, AppointmentGateway};
pub use conflict::BookingConflictResolver;
pub use lifecycle::{AppointmentLifecycleController, FlowError, FlowNotice, FlowSnapshot, FlowState};
pub use request_builder::AppointmentRequestBuilder;
