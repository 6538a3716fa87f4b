//! Language-model client implementations.

pub mod anthropic;
