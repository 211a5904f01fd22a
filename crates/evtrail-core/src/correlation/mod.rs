//! Correlation id storage, resolution and propagation.
//!
//! ```
//! use evtrail_core::correlation::CorrelationRegistry;
//!
//! let registry = CorrelationRegistry::default();
//! registry.set("req-1").unwrap();
//! {
//!     let _scope = registry.scope("req-2").unwrap();
//!     assert_eq!(registry.get().as_str(), "req-2");
//! }
//! assert_eq!(registry.get().as_str(), "req-1");
//! ```

pub mod env;
mod lane;
pub mod propagate;
pub mod registry;

pub use env::{EnvSource, ProcessEnv};
pub use lane::ScopeGuard;
pub use propagate::CorrelationSnapshot;
pub use registry::{CorrelationConfig, CorrelationRegistry, Resolution};
