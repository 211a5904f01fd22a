//! Resolution and scoping of the active correlation id.

use crate::correlation::env::{EnvSource, ProcessEnv};
use crate::correlation::lane::{self, ScopeGuard};
use crate::errors::{EvtrailError, Result};
use evtrail_core_types::CorrelationId;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_INBOUND_VAR: &str = "EVTRAIL_CORRELATION_ID";
pub const DEFAULT_SESSION_VAR: &str = "EVTRAIL_SESSION_ID";
pub const DEFAULT_TRACE_VAR: &str = "EVTRAIL_TRACE_ID";

/// Environment variable names used by the registry
///
/// The order inbound → session → trace is fixed; only the names are
/// configurable. `subprocess_var` defaults to the inbound name so a child
/// process resolves its parent's id at the first environment step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub inbound_var: String,
    pub session_var: String,
    pub trace_var: String,
    pub subprocess_var: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            inbound_var: DEFAULT_INBOUND_VAR.to_string(),
            session_var: DEFAULT_SESSION_VAR.to_string(),
            trace_var: DEFAULT_TRACE_VAR.to_string(),
            subprocess_var: DEFAULT_INBOUND_VAR.to_string(),
        }
    }
}

/// Where a resolved id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Inbound,
    Session,
    Trace,
    Generated,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Inbound => "inbound",
            Resolution::Session => "session",
            Resolution::Trace => "trace",
            Resolution::Generated => "generated",
        }
    }
}

/// Resolves, holds and scopes the correlation id of the current context
///
/// The registry itself is cheap to clone and carries only configuration.
/// Values live in process-wide per-thread and per-task lanes that every
/// registry shares, not just clones of one: a registry configured with other
/// variable names still returns an id another registry already cached in
/// the current lane. Configuration only decides how an empty lane resolves.
///
/// Async code gets a lane of its own only inside [`scope_task`](Self::scope_task),
/// [`propagate_to_task`](Self::propagate_to_task) or an instrumented
/// `call_async`. A bare `tokio::spawn`ed task falls back to the worker
/// thread's lane, which sibling tasks polled on that thread also see.
#[derive(Clone)]
pub struct CorrelationRegistry {
    config: Arc<CorrelationConfig>,
    env: Arc<dyn EnvSource>,
}

impl CorrelationRegistry {
    /// Registry reading the real process environment
    pub fn new(config: CorrelationConfig) -> Self {
        Self::with_env(config, ProcessEnv)
    }

    /// Registry reading a caller-supplied environment
    pub fn with_env(config: CorrelationConfig, env: impl EnvSource + 'static) -> Self {
        Self {
            config: Arc::new(config),
            env: Arc::new(env),
        }
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Active correlation id for the current context
    ///
    /// The first read in a lane walks the precedence chain and caches the
    /// result in the lane; later reads return the cached value even if the
    /// environment has changed since. Outside a task lane inside a tokio
    /// runtime this caches on the worker thread; enter bare tasks through
    /// `scope_task` or `propagate_to_task`.
    pub fn get(&self) -> CorrelationId {
        if let Some(id) = lane::current() {
            return id;
        }
        let id = self.resolve_logged();
        lane::store(&id);
        id
    }

    /// Current lane value, or a fresh resolution that is not cached anywhere
    pub(crate) fn current_or_resolve(&self) -> CorrelationId {
        lane::current().unwrap_or_else(|| self.resolve_logged())
    }

    /// Run `future` in its own task lane unless it is already inside one
    ///
    /// The new lane is seeded from [`current_or_resolve`](Self::current_or_resolve),
    /// so the worker thread's lane is never written.
    pub(crate) async fn in_own_task_lane<F: Future>(&self, future: F) -> F::Output {
        if lane::in_task_lane() {
            return future.await;
        }
        let id = self.current_or_resolve();
        lane::scope_task(id, future).await
    }

    fn resolve_logged(&self) -> CorrelationId {
        let (id, resolution) = self.resolve();
        tracing::debug!(
            component = module_path!(),
            op = "correlation.resolve",
            source = resolution.as_str(),
            task_lane = lane::in_task_lane(),
            correlation_id = %id,
        );
        id
    }

    /// Value already held by the current lane, without resolving
    pub fn peek(&self) -> Option<CorrelationId> {
        lane::current()
    }

    /// Walk the precedence chain without touching any lane
    pub fn resolve(&self) -> (CorrelationId, Resolution) {
        let chain = [
            (&self.config.inbound_var, Resolution::Inbound),
            (&self.config.session_var, Resolution::Session),
            (&self.config.trace_var, Resolution::Trace),
        ];
        for (var, resolution) in chain {
            if let Some(id) = self.env.var(var).as_deref().and_then(CorrelationId::parse) {
                return (id, resolution);
            }
        }
        (CorrelationId::generate(), Resolution::Generated)
    }

    /// Set the id of the current lane
    ///
    /// Inside a tokio runtime but outside a task lane the value lands on the
    /// worker thread, where sibling tasks can overwrite it across an
    /// `.await`. That case is logged at `WARN`; bare tasks should be entered
    /// through `scope_task` or `propagate_to_task`.
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::InvalidCorrelationId` if `id` is blank.
    pub fn set(&self, id: &str) -> Result<()> {
        let id = parse(id)?;
        if !lane::in_task_lane() && tokio::runtime::Handle::try_current().is_ok() {
            tracing::warn!(
                component = module_path!(),
                op = "correlation.set",
                event = "thread_lane_in_runtime",
                correlation_id = %id,
                "correlation id set on a runtime thread outside a task lane"
            );
        }
        lane::store(&id);
        Ok(())
    }

    /// Forget the current lane's value so the next `get` resolves again
    pub fn clear(&self) {
        lane::replace(None);
    }

    /// Make `id` active until the returned guard is dropped
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::InvalidCorrelationId` if `id` is blank.
    pub fn scope(&self, id: &str) -> Result<ScopeGuard> {
        Ok(ScopeGuard::enter(parse(id)?))
    }

    /// Run a future in its own task lane holding `id`
    ///
    /// The value survives every `.await` inside the future and is never
    /// visible to other tasks.
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::InvalidCorrelationId` if `id` is blank.
    pub fn scope_task<F: Future>(
        &self,
        id: &str,
        future: F,
    ) -> Result<impl Future<Output = F::Output>> {
        Ok(lane::scope_task(parse(id)?, future))
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new(CorrelationConfig::default())
    }
}

impl fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn parse(id: &str) -> Result<CorrelationId> {
    CorrelationId::parse(id).ok_or_else(|| EvtrailError::InvalidCorrelationId {
        reason: "correlation id must not be empty or whitespace".to_string(),
    })
}
