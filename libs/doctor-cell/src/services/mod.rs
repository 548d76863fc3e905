pub mod availability;
pub mod doctor;

pub use availability::SlotAvailabilityFilter;
pub use doctor::{is_unauthorized, DoctorDirectory, DoctorService};
