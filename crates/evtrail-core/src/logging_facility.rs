//! Structured logging facility for evtrail
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Test capture mode for deterministic assertions
//!
//! Every event the crate emits carries the canonical `component`, `op` and
//! `event` fields. Instrumentation failures go to the `evtrail::fallback`
//! target at `WARN`.
//!
//! # Usage
//!
//! ```rust
//! use evtrail_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```

pub mod init;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
