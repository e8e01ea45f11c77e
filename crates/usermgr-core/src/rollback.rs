//! Rollback scope: a LIFO list of compensations, run in
//! reverse order on unwind and discarded on commit.

use std::future::Future;
use std::pin::Pin;

type Compensation = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Ordered list of compensating actions registered by a handler as it
/// commits each step: each committed step pushes its inverse.
///
/// The handler owns one `RollbackScope` for its whole lifetime. Call
/// [`Self::commit`] once every step has succeeded, or [`Self::unwind`] on
/// the first failure. Dropping a non-empty, uncommitted scope logs a bug —
/// every handler path must explicitly decide.
pub struct RollbackScope {
    compensations: Vec<Compensation>,
}

impl RollbackScope {
    /// An empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compensations: Vec::new(),
        }
    }

    /// Register a compensation whose own failure is logged and does not
    /// stop the unwind.
    pub fn push<F, Fut, E>(&mut self, label: &'static str, compensation: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        self.compensations.push(Box::new(move || {
            Box::pin(async move {
                if let Err(e) = compensation().await {
                    tracing::warn!(compensation = label, error = %e, "rollback compensation failed");
                }
            })
        }));
    }

    /// Discard every registered compensation. Called once a handler has
    /// returned its success response.
    pub fn commit(mut self) {
        self.compensations.clear();
    }

    /// Run every compensation newest-first, swallowing individual failures.
    pub async fn unwind(mut self) {
        while let Some(compensation) = self.compensations.pop() {
            compensation().await;
        }
    }

    /// Whether anything is registered (test/debug helper).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compensations.is_empty()
    }
}

impl Default for RollbackScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RollbackScope {
    fn drop(&mut self) {
        if !self.compensations.is_empty() {
            tracing::error!(
                pending = self.compensations.len(),
                "rollback scope dropped without commit or unwind"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn unwind_runs_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scope = RollbackScope::new();
        for step in [1, 2, 3] {
            let order = Arc::clone(&order);
            scope.push::<_, _, std::convert::Infallible>("step", move || async move {
                order.lock().unwrap().push(step);
                Ok(())
            });
        }
        scope.unwind().await;
        assert_eq!(*order.lock().unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn commit_runs_nothing() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scope = RollbackScope::new();
        let inner = Arc::clone(&order);
        scope.push::<_, _, std::convert::Infallible>("step", move || async move {
            inner.lock().unwrap().push(1);
            Ok(())
        });
        scope.commit();
        assert!(order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_failing_compensation_does_not_stop_the_unwind() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scope = RollbackScope::new();
        scope.push::<_, _, &'static str>("fails", || async { Err("boom") });
        let inner = Arc::clone(&order);
        scope.push::<_, _, std::convert::Infallible>("succeeds", move || async move {
            inner.lock().unwrap().push(1);
            Ok(())
        });
        scope.unwind().await;
        assert_eq!(*order.lock().unwrap(), vec![1]);
    }
}
