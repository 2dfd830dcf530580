//! Fault-aggregating teardown
//!
//! A [`Trap`] is one deferred, independently failable cleanup action. A
//! [`TrapAggregator`] runs every registered trap exactly once, in registration
//! order, whether or not earlier ones failed, and then reports all failures
//! together as a single [`TeardownFailure`].
//!
//! A teardown pass goes `Idle -> Running -> Succeeded | Failed(list)`.
//! [`TrapAggregator::run`] consumes the aggregator, so a pass cannot be
//! restarted.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Error type produced by a single trap
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

enum Action {
    Sync(Box<dyn FnOnce() -> Result<(), BoxError> + Send>),
    Async(BoxFuture<'static, Result<(), BoxError>>),
}

/// A deferred cleanup action
pub struct Trap {
    label: Option<String>,
    action: Action,
}

impl Trap {
    /// Wrap a synchronous fallible action
    pub fn new<F, E>(action: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            label: None,
            action: Action::Sync(Box::new(move || action().map_err(Into::into))),
        }
    }

    /// Wrap an asynchronous fallible action; it is not polled until the trap runs
    pub fn from_future<Fut, E>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            label: None,
            action: Action::Async(Box::pin(async move { future.await.map_err(Into::into) })),
        }
    }

    /// Attach a human-readable label used in reports
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Run every trap and fail with all captured errors, if any
    pub async fn assert_empty(
        traps: impl IntoIterator<Item = Trap>,
    ) -> Result<(), TeardownFailure> {
        traps.into_iter().collect::<TrapAggregator>().run().await
    }

    /// Execute the action, turning a panic into an ordinary failure
    async fn execute(self) -> Result<(), BoxError> {
        match self.action {
            Action::Sync(action) => std::panic::catch_unwind(AssertUnwindSafe(action))
                .unwrap_or_else(|payload| Err(panic_error(payload))),
            Action::Async(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(panic_error(payload))),
        }
    }
}

impl fmt::Debug for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.action {
            Action::Sync(_) => "sync",
            Action::Async(_) => "async",
        };
        f.debug_struct("Trap")
            .field("label", &self.label)
            .field("kind", &kind)
            .finish()
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> BoxError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("trap panicked: {}", message).into()
}

/// One failed trap: its position, label and the original error
#[derive(Debug)]
pub struct TrapFailure {
    index: usize,
    label: Option<String>,
    source: BoxError,
}

impl TrapFailure {
    /// 0-based registration index of the trap
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The error the trap returned, unchanged
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    pub fn into_error(self) -> BoxError {
        self.source
    }
}

impl fmt::Display for TrapFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "trap #{} ({}) failed: {}", self.index, label, self.source),
            None => write!(f, "trap #{} failed: {}", self.index, self.source),
        }
    }
}

impl StdError for TrapFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Every failure from one teardown pass, in registration order
#[derive(Debug)]
pub struct TeardownFailure {
    failures: Vec<TrapFailure>,
}

impl TeardownFailure {
    pub fn failures(&self) -> &[TrapFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<TrapFailure> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown action(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

impl StdError for TeardownFailure {}

/// Ordered collection of traps making up one teardown pass
#[derive(Debug, Default)]
pub struct TrapAggregator {
    traps: Vec<Trap>,
}

impl TrapAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trap; traps run in registration order
    pub fn push(&mut self, trap: Trap) -> &mut Self {
        self.traps.push(trap);
        self
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Run every trap once and aggregate the failures
    ///
    /// Never short-circuits. A trap that hangs blocks the pass; no timeout is
    /// applied here.
    pub async fn run(self) -> Result<(), TeardownFailure> {
        let total = self.traps.len();
        let mut failures = Vec::new();

        for (index, trap) in self.traps.into_iter().enumerate() {
            let label = trap.label.clone();
            match trap.execute().await {
                Ok(()) => {
                    tracing::debug!(
                        trap_index = index,
                        trap_label = label.as_deref().unwrap_or(""),
                        "Teardown action completed"
                    );
                }
                Err(source) => {
                    tracing::warn!(
                        trap_index = index,
                        trap_label = label.as_deref().unwrap_or(""),
                        error = %source,
                        "Teardown action failed; continuing with remaining actions"
                    );
                    failures.push(TrapFailure {
                        index,
                        label,
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            tracing::warn!(
                failed = failures.len(),
                total,
                "Teardown pass finished with failures"
            );
            Err(TeardownFailure { failures })
        }
    }
}

impl FromIterator<Trap> for TrapAggregator {
    fn from_iter<I: IntoIterator<Item = Trap>>(iter: I) -> Self {
        Self {
            traps: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Trap>> for TrapAggregator {
    fn from(traps: Vec<Trap>) -> Self {
        Self { traps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_no_traps_succeeds() {
        assert!(Trap::assert_empty(Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_first_failure_does_not_stop_second() {
        let ran_second = Arc::new(AtomicUsize::new(0));
        let ran = ran_second.clone();

        let traps = vec![
            Trap::new(|| Err::<(), _>(AppError::Internal("container stuck".to_string())))
                .with_label("destroy environment"),
            Trap::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<(), AppError>(())
            })
            .with_label("destroy network"),
        ];

        let failure = Trap::assert_empty(traps).await.unwrap_err();
        assert_eq!(ran_second.load(Ordering::SeqCst), 1);
        assert_eq!(failure.len(), 1);
        assert_eq!(failure.failures()[0].index(), 0);
        assert_eq!(failure.failures()[0].label(), Some("destroy environment"));
        assert!(failure.to_string().contains("container stuck"));
    }

    #[tokio::test]
    async fn test_all_failures_reported_in_order() {
        let traps = vec![
            Trap::new(|| Err::<(), _>("first")),
            Trap::new(|| Ok::<(), BoxError>(())),
            Trap::from_future(async { Err::<(), _>("third") }),
        ];

        let failure = Trap::assert_empty(traps).await.unwrap_err();
        let messages: Vec<String> = failure
            .failures()
            .iter()
            .map(|f| f.error().to_string())
            .collect();
        assert_eq!(messages, vec!["first", "third"]);
        let indices: Vec<usize> = failure.failures().iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_original_error_is_preserved() {
        let traps = vec![Trap::new(|| {
            Err::<(), _>(AppError::Provisioning {
                resource: "network".to_string(),
                reason: "in use".to_string(),
            })
        })];

        let failure = Trap::assert_empty(traps).await.unwrap_err();
        let error = failure.into_failures().remove(0).into_error();
        let app_error = error
            .downcast::<AppError>()
            .expect("the original error type should survive aggregation");
        assert!(matches!(*app_error, AppError::Provisioning { .. }));
    }

    #[tokio::test]
    async fn test_panicking_trap_is_captured() {
        let counter = Arc::new(AtomicUsize::new(0));
        let after = counter.clone();

        let mut aggregator = TrapAggregator::new();
        aggregator
            .push(Trap::new(|| -> Result<(), BoxError> { panic!("boom") }))
            .push(Trap::from_future(async move {
                after.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }));
        assert_eq!(aggregator.len(), 2);

        let failure = aggregator.run().await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(failure.failures()[0].error().to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_async_trap_not_polled_before_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = counter.clone();
        let trap = Trap::from_future(async move {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        });

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        Trap::assert_empty([trap]).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trap_failure_display_with_and_without_label() {
        let labelled = TrapFailure {
            index: 1,
            label: Some("destroy network".to_string()),
            source: "gone".into(),
        };
        assert_eq!(labelled.to_string(), "trap #1 (destroy network) failed: gone");

        let bare = TrapFailure {
            index: 0,
            label: None,
            source: "gone".into(),
        };
        assert_eq!(bare.to_string(), "trap #0 failed: gone");
    }

    #[test]
    fn test_teardown_failure_converts_to_app_error() {
        let failure = TeardownFailure {
            failures: vec![TrapFailure {
                index: 0,
                label: None,
                source: "x".into(),
            }],
        };
        let err: AppError = failure.into();
        assert_eq!(err.to_string(), "1 teardown action(s) failed; trap #0 failed: x");
    }
}
