//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (formloom-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod form;
pub mod limiter;
pub mod message;

pub use form::FormRepository;
pub use limiter::UsageLimiter;
pub use message::MessageRepository;
