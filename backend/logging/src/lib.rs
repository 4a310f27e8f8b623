//! Structured logging for grokgram.
//!
//! Console output (plain or JSON), an optional rolling NDJSON file, and
//! scrubbing of credentials from strings before they are logged.

pub mod logger;
pub mod redact;

pub use logger::{LogOptions, init_logger};
pub use redact::redact_sensitive_data;
