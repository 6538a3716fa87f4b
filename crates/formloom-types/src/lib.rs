//! Shared domain types for Formloom.
//!
//! This crate contains the core domain types used across the Formloom
//! platform: forms and versions, questions, agent events and state, chat
//! messages, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono,
//! thiserror, and schemars for the tool input contracts.

pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod form;
pub mod identity;
pub mod llm;
pub mod question;
