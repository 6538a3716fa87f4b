//! Language-model port.

pub mod model;

pub use model::LanguageModel;
