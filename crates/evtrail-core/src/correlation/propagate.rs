//! Explicit hand-off of the correlation id across execution boundaries.
//!
//! Worker threads, spawned tasks and child processes never inherit the
//! submitting context's lane. Each helper here takes a copy of the resolved
//! id at call time and installs it on the other side.

use crate::correlation::lane::{self, ScopeGuard};
use crate::correlation::registry::CorrelationRegistry;
use evtrail_core_types::CorrelationId;
use std::collections::BTreeMap;
use std::future::Future;
use std::process::Command;

/// Copy of a resolved correlation id, detached from any lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationSnapshot {
    id: CorrelationId,
}

impl CorrelationSnapshot {
    pub fn new(id: CorrelationId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Install the snapshot in the current lane until the guard drops
    pub fn enter(&self) -> ScopeGuard {
        ScopeGuard::enter(self.id.clone())
    }

    /// Run `f` with the snapshot installed
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// Run a future in a task lane seeded with the snapshot
    pub fn instrument<F: Future>(self, future: F) -> impl Future<Output = F::Output> {
        lane::scope_task(self.id, future)
    }
}

impl CorrelationRegistry {
    /// Resolve the current id and detach a copy of it
    pub fn snapshot(&self) -> CorrelationSnapshot {
        CorrelationSnapshot::new(self.get())
    }

    /// Wrap `f` for execution on another thread or pool worker
    ///
    /// The id is captured now, not when the worker runs. Inside the worker it
    /// is installed for the duration of `f` and removed afterwards; whatever
    /// `f` does to its own lane stays there.
    pub fn propagate_to_worker<F, R>(&self, f: F) -> impl FnOnce() -> R + Send
    where
        F: FnOnce() -> R + Send,
    {
        let snapshot = self.snapshot();
        move || snapshot.run(f)
    }

    /// Wrap a future for `tokio::spawn` so the task starts in its own lane
    /// seeded with the current id
    pub fn propagate_to_task<F: Future>(&self, future: F) -> impl Future<Output = F::Output> {
        self.snapshot().instrument(future)
    }

    /// Build a child environment map carrying the current id
    ///
    /// `env` is copied; the configured subprocess variable is set (or
    /// overwritten) with the resolved id. The map can be handed to any
    /// process-spawning API.
    pub fn propagate_to_subprocess<I, K, V>(&self, env: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut child: BTreeMap<String, String> = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        child.insert(
            self.config().subprocess_var.clone(),
            self.get().into_string(),
        );
        child
    }

    /// Set the correlation variable on a `std::process::Command`
    pub fn apply_to_command<'a>(&self, command: &'a mut Command) -> &'a mut Command {
        command.env(&self.config().subprocess_var, self.get().as_str())
    }
}
