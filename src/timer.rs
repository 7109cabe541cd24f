//! Cancellable waits and the process-wide shutdown signal.

use std::time::Duration;
use tokio::sync::watch;

/// Sending half, owned by whoever listens for the interrupt.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half, cloned into every cancellable wait.
#[derive(Clone)]
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

    /// Resolves once shutdown is requested. Never resolves if the trigger is dropped untriggered.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep for `total`, calling `on_tick` with the time left every `tick`.
///
/// The callback is the only place progress is rendered, so the display cadence
/// is just the `tick` argument.
pub async fn countdown<F>(total: Duration, tick: Duration, shutdown: &mut Shutdown, mut on_tick: F) -> WaitOutcome
where
    F: FnMut(Duration),
{
    let tick = if tick.is_zero() { total } else { tick };
    let mut remaining = total;

    while !remaining.is_zero() {
        if shutdown.is_triggered() {
            return WaitOutcome::Cancelled;
        }
        on_tick(remaining);

        let step = tick.min(remaining);
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = shutdown.triggered() => return WaitOutcome::Cancelled,
        }
        remaining = remaining.saturating_sub(step);
    }

    if shutdown.is_triggered() {
        WaitOutcome::Cancelled
    } else {
        WaitOutcome::Elapsed
    }
}
