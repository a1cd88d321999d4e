//! Response lifecycle events.
//!
//! Every [`Request`](crate::Request) carries a [`Lifecycle`]: an event source
//! that fires once the request/response cycle reaches a terminal state,
//! which is usually well after the handler has returned.
//!
//! | Event | Fired when |
//! |---|---|
//! | **finish** | the whole response has been handed to the connection |
//! | **error** | the response could not be delivered (peer went away, connection error, request dropped mid-flight) |
//!
//! Observers run on whatever task drives the connection, not on the task
//! that registered them. Wrap them in [`context::bind`](crate::context::bind)
//! to keep their correlation scope.
//!
//! The two event kinds are independent: emitting one does not disarm the
//! other. The server emits exactly one of them per request, but nothing in
//! this type enforces that.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use http::StatusCode;

type FinishObserver = Box<dyn FnOnce(Finished) + Send + 'static>;
type ErrorObserver = Box<dyn FnOnce(Failure) + Send + 'static>;

/// Payload of the **finish** event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Finished {
    pub status: StatusCode,
}

/// Payload of the **error** event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Failure {
    pub reason: String,
}

impl Failure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Default)]
struct Observers {
    finish: Vec<FinishObserver>,
    error: Vec<ErrorObserver>,
}

/// Event source for one request's response lifecycle.
///
/// Clones share the same observers.
#[derive(Clone, Default)]
pub struct Lifecycle {
    observers: Arc<Mutex<Observers>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for the **finish** event.
    pub fn on_finish(&self, observer: impl FnOnce(Finished) + Send + 'static) {
        self.lock().finish.push(Box::new(observer));
    }

    /// Registers an observer for the **error** event.
    pub fn on_error(&self, observer: impl FnOnce(Failure) + Send + 'static) {
        self.lock().error.push(Box::new(observer));
    }

    /// Fires **finish**. Each finish observer runs at most once; observers
    /// registered afterwards are never called by this emission.
    pub fn emit_finish(&self, finished: Finished) {
        // Take the observers out before running them so an observer may
        // register further observers without deadlocking.
        let observers = std::mem::take(&mut self.lock().finish);
        for observer in observers {
            observer(finished);
        }
    }

    /// Fires **error**, with the same single-shot semantics as
    /// [`emit_finish`](Lifecycle::emit_finish).
    pub fn emit_error(&self, failure: Failure) {
        let observers = std::mem::take(&mut self.lock().error);
        for observer in observers {
            observer(failure.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Observers> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observers = self.lock();
        f.debug_struct("Lifecycle")
            .field("finish", &observers.finish.len())
            .field("error", &observers.error.len())
            .finish()
    }
}

// ── Completion ────────────────────────────────────────────────────────────────

/// Server-side trigger that settles a [`Lifecycle`] exactly once.
///
/// Dropping an unsettled `Completion` emits **error**: it means the request
/// future or its response body went away before delivery finished.
pub(crate) struct Completion {
    lifecycle: Option<Lifecycle>,
}

impl Completion {
    pub(crate) fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle: Some(lifecycle) }
    }

    pub(crate) fn finish(mut self, status: StatusCode) {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.emit_finish(Finished { status });
        }
    }

    pub(crate) fn fail(mut self, failure: Failure) {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.emit_error(failure);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.emit_error(Failure::new("response dropped before completion"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let read = Arc::clone(&count);
        (count, move || read.load(Ordering::SeqCst))
    }

    #[test]
    fn finish_observers_fire_once() {
        let lifecycle = Lifecycle::new();
        let (count, fired) = counter();
        lifecycle.on_finish(move |f| {
            assert_eq!(f.status, StatusCode::OK);
            count.fetch_add(1, Ordering::SeqCst);
        });

        lifecycle.emit_finish(Finished { status: StatusCode::OK });
        lifecycle.emit_finish(Finished { status: StatusCode::OK });
        assert_eq!(fired(), 1);
    }

    #[test]
    fn finish_and_error_are_independent() {
        let lifecycle = Lifecycle::new();
        let (finish_count, finished) = counter();
        let (error_count, errored) = counter();
        lifecycle.on_finish(move |_| {
            finish_count.fetch_add(1, Ordering::SeqCst);
        });
        lifecycle.on_error(move |_| {
            error_count.fetch_add(1, Ordering::SeqCst);
        });

        lifecycle.emit_finish(Finished { status: StatusCode::OK });
        lifecycle.emit_error(Failure::new("reset"));
        assert_eq!((finished(), errored()), (1, 1));
    }

    #[test]
    fn observer_may_register_more_observers() {
        let lifecycle = Lifecycle::new();
        let inner = lifecycle.clone();
        lifecycle.on_finish(move |_| inner.on_error(|_| {}));

        lifecycle.emit_finish(Finished { status: StatusCode::OK });
        assert_eq!(format!("{lifecycle:?}"), "Lifecycle { finish: 0, error: 1 }");
    }

    #[test]
    fn dropped_completion_emits_error() {
        let lifecycle = Lifecycle::new();
        let (count, errored) = counter();
        lifecycle.on_error(move |failure| {
            assert_eq!(failure.reason, "response dropped before completion");
            count.fetch_add(1, Ordering::SeqCst);
        });

        drop(Completion::new(lifecycle.clone()));
        assert_eq!(errored(), 1);
    }

    #[test]
    fn settled_completion_does_not_emit_on_drop() {
        let lifecycle = Lifecycle::new();
        let (count, errored) = counter();
        lifecycle.on_error(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        Completion::new(lifecycle.clone()).finish(StatusCode::OK);
        assert_eq!(errored(), 0);
    }
}
