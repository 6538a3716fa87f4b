//! Anthropic Messages API client.

mod client;
mod types;

pub use client::AnthropicModel;
