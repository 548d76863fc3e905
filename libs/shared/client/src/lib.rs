pub mod rest;

pub use rest::{HospitalApiClient, HttpReply, TransportError};
