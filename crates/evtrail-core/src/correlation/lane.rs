//! Per-execution-context storage for the active correlation id.
//!
//! Two kinds of lane exist:
//!
//! - the **task lane**, tokio task-local storage installed by
//!   [`scope_task`]; it follows one future across suspension points and is
//!   invisible to sibling tasks
//! - the **thread lane**, a thread-local used everywhere else
//!
//! The task lane wins whenever the current code is polled inside one.

use evtrail_core_types::CorrelationId;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

type Slot = RefCell<Option<CorrelationId>>;

thread_local! {
    static THREAD_LANE: Slot = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_LANE: Slot;
}

fn with_lane<R>(f: impl Fn(&Slot) -> R) -> R {
    TASK_LANE
        .try_with(|slot| f(slot))
        .unwrap_or_else(|_| THREAD_LANE.with(|slot| f(slot)))
}

/// Value held by the current lane, without resolving anything
pub(crate) fn current() -> Option<CorrelationId> {
    with_lane(|slot| slot.borrow().clone())
}

/// Store a value in the current lane
pub(crate) fn store(id: &CorrelationId) {
    with_lane(|slot| *slot.borrow_mut() = Some(id.clone()));
}

/// Swap the current lane's value, returning the old one
pub(crate) fn replace(id: Option<CorrelationId>) -> Option<CorrelationId> {
    with_lane(|slot| slot.replace(id.clone()))
}

/// True when running inside a task lane
pub(crate) fn in_task_lane() -> bool {
    TASK_LANE.try_with(|_| ()).is_ok()
}

/// Run a future inside a fresh task lane holding `id`
pub(crate) fn scope_task<F: Future>(
    id: CorrelationId,
    future: F,
) -> impl Future<Output = F::Output> {
    TASK_LANE.scope(RefCell::new(Some(id)), future)
}

/// Active correlation scope
///
/// Created by [`CorrelationRegistry::scope`](super::CorrelationRegistry::scope).
/// Dropping the guard restores the value that was active before it was
/// created, on normal exit and during unwinding alike. Guards are `!Send`:
/// async code uses `scope_task` instead of holding a guard across `.await`.
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    previous: Option<CorrelationId>,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    pub(crate) fn enter(id: CorrelationId) -> Self {
        let previous = replace(Some(id));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        replace(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CorrelationId {
        CorrelationId::parse(s).unwrap()
    }

    #[test]
    fn test_guard_restores_previous() {
        store(&id("outer"));
        {
            let _guard = ScopeGuard::enter(id("inner"));
            assert_eq!(current(), Some(id("inner")));
        }
        assert_eq!(current(), Some(id("outer")));
    }

    #[test]
    fn test_guard_restores_empty_lane() {
        replace(None);
        {
            let _guard = ScopeGuard::enter(id("inner"));
        }
        assert_eq!(current(), None);
    }

    #[test]
    fn test_thread_lane_outside_task() {
        assert!(!in_task_lane());
    }

    #[tokio::test]
    async fn test_task_lane_shadows_thread_lane() {
        store(&id("thread"));
        let seen = scope_task(id("task"), async {
            assert!(in_task_lane());
            current()
        })
        .await;
        assert_eq!(seen, Some(id("task")));
        assert_eq!(current(), Some(id("thread")));
    }
}
