//! Core types shared across evtrail facilities
//!
//! This crate provides the vocabulary used by the codec, hasher, registry
//! and instrumenter:
//!
//! - **Correlation**: `CorrelationId`
//! - **Events**: `EventType` baseline taxonomy
//! - **Sensitive data**: `Sensitive<T>` marker for automatic redaction
//! - **Schema constants**: canonical field keys and statuses

pub mod correlation;
pub mod event;
pub mod schema;
pub mod sensitive;

pub use correlation::CorrelationId;
pub use event::EventType;
pub use sensitive::Sensitive;
