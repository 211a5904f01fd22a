//! TOML configuration for the registry, instrumenter and logging facility.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [correlation]
//! inbound_var = "REQUEST_ID"
//! subprocess_var = "REQUEST_ID"
//!
//! [instrument]
//! capture_result = true
//! level = "debug"
//!
//! [logging]
//! profile = "production"
//! ```

use crate::correlation::{CorrelationConfig, CorrelationRegistry};
use crate::errors::{EvtrailError, Result};
use crate::instrument::{ActionInstrumenter, InstrumentOptions};
use crate::logging_facility::Profile;
use crate::sink::LogSink;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvtrailConfig {
    pub correlation: CorrelationConfig,
    pub instrument: InstrumentOptions,
    pub logging: LoggingConfig,
}

impl EvtrailConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::Config` on malformed TOML, unknown sections,
    /// or an environment variable name that is blank or contains `=`.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `EvtrailError::Config` naming the first invalid variable.
    pub fn validate(&self) -> Result<()> {
        let c = &self.correlation;
        let names = [
            ("inbound_var", &c.inbound_var),
            ("session_var", &c.session_var),
            ("trace_var", &c.trace_var),
            ("subprocess_var", &c.subprocess_var),
        ];
        for (key, name) in names {
            if name.trim().is_empty() || name.contains('=') || name.contains('\0') {
                return Err(EvtrailError::Config {
                    message: format!("correlation.{} is not a valid variable name: {:?}", key, name),
                });
            }
        }
        Ok(())
    }

    /// Registry reading the process environment with the configured names
    pub fn registry(&self) -> CorrelationRegistry {
        CorrelationRegistry::new(self.correlation.clone())
    }

    /// Instrumenter over [`registry`](Self::registry) with the configured
    /// default options
    pub fn instrumenter(&self, sink: impl LogSink + 'static) -> ActionInstrumenter {
        ActionInstrumenter::new(self.registry(), sink).with_defaults(self.instrument.clone())
    }
}
