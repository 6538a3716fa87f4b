//! Observability setup for Formloom.

pub mod tracing_setup;
