//! Core business logic for Formloom.
//!
//! This crate holds the protocol heart of the platform: the schema
//! validator/repairer, the bounded agent tool loop, the per-session event
//! stream, the client state reducer, and the bridge synchronizer.
//! Storage and model access are ports (traits); implementations live in
//! formloom-infra.

pub mod agent;
pub mod bridge;
pub mod event;
pub mod llm;
pub mod reducer;
pub mod repository;
pub mod schema;
pub mod service;
pub mod tool;
