//! Periodic refresh of a messaging screen.
//!
//! A [`PollScheduler`] runs a refresh task once immediately when started and
//! then on a fixed interval until it is stopped or the task asks to halt.
//! At most one invocation of the task is in flight at any time: timer ticks
//! that fire while an invocation is still running are dropped, while
//! explicit refreshes wait their turn.

use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What the scheduler should do after an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling.
    Continue,
    /// Stop the timer until the scheduler is started again.
    Halt,
}

/// A refresh task the scheduler can invoke repeatedly.
pub type PollTask = Arc<dyn Fn() -> BoxFuture<'static, PollOutcome> + Send + Sync>;

/// Wrap an async closure as a [`PollTask`].
pub fn poll_task<F, Fut>(f: F) -> PollTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PollOutcome> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, PollOutcome> { Box::pin(f()) })
}

#[derive(Debug, Default)]
struct Lifecycle {
    active: bool,
    /// Bumped on every start and stop so a stale activation can tell it
    /// was superseded.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Owner of one screen's refresh timer.
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    lifecycle: Arc<Mutex<Lifecycle>>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        lock(&self.lifecycle).active
    }

    /// Activate the scheduler: invoke `task` now, then every interval.
    ///
    /// Returns `false` without doing anything if the scheduler is already
    /// active. The returned future completes once the immediate invocation
    /// has finished.
    pub async fn start(&self, task: PollTask) -> bool {
        let generation = {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.active {
                tracing::debug!("Poll scheduler already active, ignoring start");
                return false;
            }
            lifecycle.active = true;
            lifecycle.generation += 1;
            lifecycle.generation
        };

        let outcome = self.exclusive(task()).await;

        let mut lifecycle = lock(&self.lifecycle);
        if !lifecycle.active || lifecycle.generation != generation {
            tracing::debug!("Poll scheduler stopped during initial refresh");
            return true;
        }
        if outcome == PollOutcome::Halt {
            tracing::info!("Initial refresh halted polling");
            lifecycle.active = false;
            return true;
        }

        lifecycle.timer = Some(tokio::spawn(repeat(
            self.interval,
            task,
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.in_flight),
            generation,
        )));
        tracing::debug!("Polling every {:?}", self.interval);
        true
    }

    /// Invoke `task` now, waiting for any in-flight invocation to finish
    /// first. A [`PollOutcome::Halt`] result stops the timer.
    pub async fn refresh(&self, task: &PollTask) -> PollOutcome {
        let generation = lock(&self.lifecycle).generation;
        let outcome = self.exclusive(task()).await;
        if outcome == PollOutcome::Halt {
            halt(&self.lifecycle, generation);
        }
        outcome
    }

    /// Cancel the timer. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if let Some(timer) = lifecycle.timer.take() {
            timer.abort();
        }
        if lifecycle.active {
            lifecycle.active = false;
            lifecycle.generation += 1;
            tracing::debug!("Poll scheduler stopped");
        }
    }

    async fn exclusive<F: Future>(&self, fut: F) -> F::Output {
        let _guard = self.in_flight.lock().await;
        fut.await
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn repeat(
    interval: Duration,
    task: PollTask,
    lifecycle: Arc<Mutex<Lifecycle>>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
    generation: u64,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let Ok(_guard) = in_flight.try_lock() else {
            tracing::debug!("Refresh still in flight, dropping tick");
            continue;
        };

        if task().await == PollOutcome::Halt {
            tracing::info!("Refresh halted polling");
            halt(&lifecycle, generation);
            return;
        }
    }
}

/// Deactivate the scheduler if `generation` is still current.
fn halt(lifecycle: &Mutex<Lifecycle>, generation: u64) {
    let mut lifecycle = lock(lifecycle);
    if lifecycle.generation != generation {
        return;
    }
    lifecycle.active = false;
    if let Some(timer) = lifecycle.timer.take() {
        timer.abort();
    }
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
