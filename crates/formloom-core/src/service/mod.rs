//! Domain services over the repository ports.

pub mod form;

pub use form::{FormService, MinorUpdatePayload};
