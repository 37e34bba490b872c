use std::sync::Mutex;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::warn;

type InFlight = Shared<BoxFuture<'static, ()>>;

/// Collapses concurrent start-up initialisation into a single run. Callers
/// arriving while a run is in flight await that run; once it finishes the
/// slot is cleared and the next call starts a fresh one.
pub struct InitGuard {
    slot: Mutex<Option<InFlight>>,
}

impl InitGuard {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Awaits the in-flight run, or starts `make()` if none is running.
    pub async fn run<F>(&self, make: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()>,
    {
        let future = {
            let mut slot = match self.slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("Init guard lock poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            slot.get_or_insert_with(|| make().shared()).clone()
        };

        future.clone().await;

        // Whoever finishes first clears the slot, unless a newer run took it.
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&future)) {
            *slot = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl Default for InitGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let guard = Arc::new(InitGuard::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let start = |guard: Arc<InitGuard>, runs: Arc<AtomicUsize>| async move {
            guard
                .run(move || {
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    .boxed()
                })
                .await;
        };

        let a = tokio::spawn(start(guard.clone(), runs.clone()));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = tokio::spawn(start(guard.clone(), runs.clone()));
        a.await.unwrap();
        b.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!guard.is_running());

        start(guard.clone(), runs.clone()).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
