//! Action instrumentation.
//!
//! [`ActionInstrumenter`] wraps a unit of work and emits exactly one
//! `task_start` bundle on entry and exactly one terminal bundle on exit:
//!
//! - `task_end` with `status = completed` on `Ok`
//! - `error` with `status = failed` on `Err` or panic (the error or panic
//!   is handed back to the caller untouched)
//! - `task_end` with `status = cancelled` when an async call is dropped
//!
//! Each can be switched off through [`InstrumentOptions`].

pub mod instrumenter;
pub mod options;
mod record;
pub mod sanitize;

pub use instrumenter::{ActionInstrumenter, FALLBACK_TARGET};
pub use options::{InstrumentOptions, LogLevel};
pub use record::{ActionState, PANIC_KIND};
