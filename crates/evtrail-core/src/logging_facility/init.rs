//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable output for development
    #[default]
    Development,
    /// JSON structured output for production
    Production,
    /// Bare registry; tests install their own capture layer
    Test,
}

impl Profile {
    /// Directive used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "evtrail=debug",
            Profile::Production | Profile::Test => "evtrail=info",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Only the first call has an effect. `try_init` is used so an embedding
/// application that already installed a global subscriber keeps it.
///
/// # Profiles
///
/// - **Development**: Human-readable logs with debug level
/// - **Production**: JSON structured logs with info level
/// - **Test**: No output; see [`init_test_capture`](super::init_test_capture)
///
/// # Example
///
/// ```
/// use evtrail_core::logging_facility::{init, Profile};
///
/// init(Profile::Production);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        let installed = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
        if installed.is_ok() {
            tracing::debug!(
                component = module_path!(),
                op = "logging.init",
                event = "initialized",
                profile = ?profile,
            );
        }
    });
}
