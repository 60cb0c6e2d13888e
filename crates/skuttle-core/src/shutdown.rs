//! Process-wide shutdown signal
//!
//! A `watch` channel flipped once on SIGINT/SIGTERM. Every reconcile task
//! holds a [`Shutdown`] clone and races its provider and delete calls against
//! it, so in-flight network calls unwind instead of being killed.

use std::future::Future;
use tokio::sync::watch;

/// Sending half, owned by `main`
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, cloned into every task
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been triggered
    ///
    /// A dropped trigger without a prior `trigger()` never resolves.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` unless shutdown wins the race; `None` means cancelled
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut shutdown = self.clone();
        tokio::select! {
            biased;
            _ = shutdown.wait() => None,
            output = fut => Some(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_without_shutdown() {
        let (_trigger, shutdown) = Shutdown::channel();
        assert_eq!(shutdown.run(async { 42 }).await, Some(42));
    }

    #[tokio::test]
    async fn test_run_after_trigger_is_cancelled() {
        let (trigger, shutdown) = Shutdown::channel();
        trigger.trigger();

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.run(async { 42 }).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_interrupts_pending_call() {
        let (trigger, shutdown) = Shutdown::channel();

        let task = tokio::spawn(async move {
            shutdown
                .run(tokio::time::sleep(Duration::from_secs(3600)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        assert_eq!(task.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropped_trigger_does_not_cancel() {
        let (trigger, shutdown) = Shutdown::channel();
        drop(trigger);

        assert_eq!(shutdown.run(async { "done" }).await, Some("done"));
    }
}
