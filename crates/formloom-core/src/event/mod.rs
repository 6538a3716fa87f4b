//! Per-session event stream transport.

pub mod stream;

pub use stream::{EventEmitter, session_channel};
