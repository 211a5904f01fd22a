//! Evidence hashing and bundle assembly.
//!
//! - [`hash`] fingerprints any [`Value`](crate::canonical::Value) as SHA-256
//!   over its canonical bytes
//! - [`build_bundle`] assembles the `{timestamp, event_type, correlation_id,
//!   ...payload}` envelope, hashes it, and seals it with `evidence_hash`

pub mod bundle;
pub mod digest;

pub use bundle::{build_bundle, build_bundle_at, EvidenceBundle};
pub use digest::hash;
