//! # Single-Flight Coordinator
//!
//! Runs one asynchronous job at a time. A trigger that arrives while a run is
//! in flight is parked; further triggers replace the parked input, so once the
//! current run ends exactly one follow-up run starts with the latest input.
//! No trigger is lost: every ticket is covered by a run that started after it
//! was issued.
//!
//! ```text
//! submit(a) ──► run(a) ─────────────► run(c) ──► idle
//! submit(b) ──► parked(b)
//! submit(c) ──► parked(c)  (b dropped, c covers it)
//! ```

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::CheckoutError;

/// The coordinated job. Errors are the job's own concern; it reports nothing back.
pub type Job<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct FlightState<T> {
    running: bool,
    pending: Option<(u64, T)>,
    issued: u64,
}

struct Inner<T> {
    job: Job<T>,
    state: Mutex<FlightState<T>>,
    /// Ticket of the most recently finished run.
    completed: watch::Sender<u64>,
    cancel: CancellationToken,
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, FlightState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SingleFlight<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> SingleFlight<T> {
    pub fn new(job: Job<T>, cancel: CancellationToken) -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                job,
                state: Mutex::new(FlightState {
                    running: false,
                    pending: None,
                    issued: 0,
                }),
                completed,
                cancel,
            }),
        }
    }

    /// Schedules a run with `input` and returns its ticket. Does not wait.
    pub fn submit(&self, input: T) -> u64 {
        let mut state = self.inner.lock();
        state.issued += 1;
        let ticket = state.issued;
        if state.pending.replace((ticket, input)).is_some() {
            trace!(ticket, "Coalesced with parked run");
        }

        if !state.running {
            state.running = true;
            tokio::spawn(drive(Arc::clone(&self.inner)));
        }
        ticket
    }

    /// Waits until a run covering `ticket` has finished.
    pub async fn wait(&self, ticket: u64) -> Result<(), CheckoutError> {
        let mut completed = self.inner.completed.subscribe();
        tokio::select! {
            done = completed.wait_for(|finished| *finished >= ticket) => {
                done.map(|_| ()).map_err(|_| CheckoutError::Cancelled)
            }
            _ = self.inner.cancel.cancelled() => Err(CheckoutError::Cancelled),
        }
    }

    /// Submits `input` and waits for it to be covered.
    pub async fn run(&self, input: T) -> Result<(), CheckoutError> {
        let ticket = self.submit(input);
        self.wait(ticket).await
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }
}

async fn drive<T>(inner: Arc<Inner<T>>) {
    loop {
        let next = {
            let mut state = inner.lock();
            match state.pending.take() {
                Some(next) if !inner.cancel.is_cancelled() => next,
                _ => {
                    state.running = false;
                    state.pending = None;
                    return;
                }
            }
        };

        let (ticket, input) = next;
        debug!(ticket, "Single-flight run started");
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => {
                debug!(ticket, "Single-flight run abandoned");
                let mut state = inner.lock();
                state.running = false;
                state.pending = None;
                return;
            }
            _ = (inner.job)(input) => {}
        }
        inner.completed.send_replace(ticket);
        debug!(ticket, "Single-flight run finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn recording_job(
        seen: Arc<Mutex<Vec<u32>>>,
        gate: Arc<Notify>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    ) -> Job<u32> {
        Arc::new(move |value| {
            let seen = seen.clone();
            let gate = gate.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                gate.notified().await;
                seen.lock().unwrap().push(value);
                active.fetch_sub(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_triggers_during_run_collapse_into_one_follow_up() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Notify::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let flight = SingleFlight::new(
            recording_job(seen.clone(), gate.clone(), active, max_active.clone()),
            CancellationToken::new(),
        );

        let first = flight.submit(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        flight.submit(2);
        let last = flight.submit(3);

        gate.notify_one();
        flight.wait(first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify_one();
        flight.wait(last).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(!flight.is_running());
    }

    #[tokio::test]
    async fn test_wait_returns_cancelled_after_token_fires() {
        let gate = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let flight = SingleFlight::new(
            recording_job(
                Arc::new(Mutex::new(Vec::new())),
                gate,
                Arc::new(AtomicUsize::new(0)),
                Arc::new(AtomicUsize::new(0)),
            ),
            cancel.clone(),
        );

        let ticket = flight.submit(7);
        cancel.cancel();
        assert!(matches!(flight.wait(ticket).await, Err(CheckoutError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_abandons_run_stuck_in_job() {
        let gate = Arc::new(Notify::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();
        let flight = SingleFlight::new(
            recording_job(
                seen.clone(),
                gate,
                Arc::new(AtomicUsize::new(0)),
                Arc::new(AtomicUsize::new(0)),
            ),
            cancel.clone(),
        );

        flight.submit(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(flight.is_running());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!flight.is_running());
        assert!(seen.lock().unwrap().is_empty());
    }
}
