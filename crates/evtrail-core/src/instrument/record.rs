//! Per-invocation state machine.

use crate::canonical::{Map, Value};
use crate::instrument::instrumenter::ActionInstrumenter;
use crate::instrument::options::{InstrumentOptions, LogLevel};
use evtrail_core_types::schema::{
    FIELD_ACTION, FIELD_ARGS, FIELD_DURATION_MS, FIELD_ERROR_KIND, FIELD_ERROR_MESSAGE,
    FIELD_ERROR_TYPE, FIELD_RESULT, FIELD_STATUS, STATUS_CANCELLED, STATUS_COMPLETED,
    STATUS_FAILED,
};
use evtrail_core_types::{CorrelationId, EventType};
use std::time::Instant;

/// Error kind recorded when the wrapped work panics
pub const PANIC_KIND: &str = "panic";

/// Lifecycle of one instrumented call
///
/// `NotStarted -> Running -> {Completed, Failed, Cancelled}`. Each
/// transition happens at most once, so at most one start bundle and one
/// terminal bundle are emitted per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    NotStarted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Transient record of one wrapped call
///
/// If the record is dropped while still `Running` (a cancelled future, or
/// unwinding that bypassed the normal path) it emits its own terminal bundle.
pub(crate) struct ActionRecord<'a> {
    instrumenter: &'a ActionInstrumenter,
    action: &'a str,
    options: &'a InstrumentOptions,
    correlation_id: CorrelationId,
    started: Instant,
    state: ActionState,
}

impl<'a> ActionRecord<'a> {
    pub(crate) fn new(
        instrumenter: &'a ActionInstrumenter,
        action: &'a str,
        options: &'a InstrumentOptions,
    ) -> Self {
        Self {
            instrumenter,
            action,
            options,
            correlation_id: instrumenter.registry().get(),
            started: Instant::now(),
            state: ActionState::NotStarted,
        }
    }

    pub(crate) fn state(&self) -> ActionState {
        self.state
    }

    pub(crate) fn start(&mut self, args: Option<Value>) {
        if self.state != ActionState::NotStarted {
            return;
        }
        self.state = ActionState::Running;
        self.started = Instant::now();

        if self.options.log_entry {
            let mut payload = Map::new().with(FIELD_ACTION, self.action);
            if let Some(args) = args {
                payload.insert(FIELD_ARGS, args);
            }
            self.emit(EventType::TaskStart, self.options.level, payload);
        }
    }

    pub(crate) fn complete(&mut self, result: Option<Value>) {
        if !self.finish(ActionState::Completed) {
            return;
        }
        if self.options.log_exit {
            let mut payload = self.terminal_payload(STATUS_COMPLETED);
            if let Some(result) = result {
                payload.insert(FIELD_RESULT, result);
            }
            self.emit(EventType::TaskEnd, self.options.level, payload);
        }
    }

    pub(crate) fn fail(&mut self, kind: &str, type_name: &str, message: &str) {
        if !self.finish(ActionState::Failed) {
            return;
        }
        if self.options.log_errors {
            let payload = self
                .terminal_payload(STATUS_FAILED)
                .with(FIELD_ERROR_KIND, kind)
                .with(FIELD_ERROR_TYPE, type_name)
                .with(FIELD_ERROR_MESSAGE, message);
            self.emit(EventType::Error, LogLevel::Error, payload);
        }
    }

    pub(crate) fn fail_with<E: std::fmt::Display>(&mut self, err: &E) {
        let type_name = std::any::type_name::<E>();
        self.fail(short_type_name(type_name), type_name, &err.to_string());
    }

    fn cancel(&mut self) {
        if !self.finish(ActionState::Cancelled) {
            return;
        }
        if self.options.log_exit {
            let payload = self.terminal_payload(STATUS_CANCELLED);
            self.emit(EventType::TaskEnd, self.options.level, payload);
        }
    }

    fn finish(&mut self, next: ActionState) -> bool {
        if self.state != ActionState::Running {
            return false;
        }
        self.state = next;
        true
    }

    fn terminal_payload(&self, status: &str) -> Map {
        let elapsed = self.started.elapsed().as_millis();
        Map::new()
            .with(FIELD_ACTION, self.action)
            .with(FIELD_STATUS, status)
            .with(FIELD_DURATION_MS, u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn emit(&self, event_type: EventType, level: LogLevel, payload: Map) {
        self.instrumenter
            .emit(self.action, &self.correlation_id, event_type, level, payload);
    }
}

impl Drop for ActionRecord<'_> {
    fn drop(&mut self) {
        if self.state != ActionState::Running {
            return;
        }
        if std::thread::panicking() {
            self.fail(PANIC_KIND, PANIC_KIND, "panicked while running");
        } else {
            self.cancel();
        }
    }
}

/// Last path segment of a type name, generics stripped
///
/// `std::io::error::Error` → `Error`, `my_app::Failure<u8>` → `Failure`
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
