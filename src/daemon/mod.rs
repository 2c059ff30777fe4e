//! Background aggregation.
//!
//! The [`Aggregator`] owns at most one scheduling task per process. Starting
//! it spawns a [`Scheduler`] loop that, on every interval, picks the most
//! overdue followed feeds and fetches them with a [`WorkerPool`]. Stopping it
//! signals the loop and waits for the in-flight cycle to finish.
//!
//! [`WorkerPool`]: crate::fetcher::parallel::WorkerPool

pub mod scheduler;
pub mod selector;

pub use scheduler::{AggregationParams, Scheduler, MAX_INTERVAL, MIN_INTERVAL};
pub use selector::{BatchSelector, MAX_BATCH_SIZE};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::{GatorError, Result};
use crate::fetcher::parallel::CycleReport;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

enum State {
    Idle,
    Running {
        stop: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
    /// `handle` is `None` while a `stop_aggregation` call is waiting on it.
    Stopping {
        handle: Option<JoinHandle<()>>,
    },
    /// A one-off cycle started through `run_once`.
    Cycle,
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorStatus {
    Idle,
    Running,
    Stopping,
    Cycle,
}

impl fmt::Display for AggregatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Cycle => "running a single cycle",
        };
        f.write_str(label)
    }
}

pub struct Aggregator<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    defaults: AggregationParams,
    state: Mutex<State>,
}

impl<S: Store + Send + Sync + 'static> Aggregator<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        normalizer: Normalizer,
        defaults: AggregationParams,
    ) -> Self {
        Self {
            store,
            fetcher,
            normalizer,
            defaults,
            state: Mutex::new(State::Idle),
        }
    }

    /// Parameters used by `start_aggregation` and `run_once`.
    pub fn defaults(&self) -> &AggregationParams {
        &self.defaults
    }

    /// Start the aggregation loop with the configured defaults, overriding
    /// the interval and logging toggle.
    pub fn start_aggregation(&self, interval: Duration, logging: bool) -> Result<()> {
        self.start(AggregationParams {
            interval,
            logging,
            ..self.defaults.clone()
        })
    }

    /// Spawn the aggregation loop. Fails with `AlreadyRunning` unless idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, params: AggregationParams) -> Result<()> {
        let mut state = self.lock();
        Self::reap(&mut state);
        if !matches!(*state, State::Idle) {
            return Err(GatorError::AlreadyRunning);
        }

        let scheduler = self.scheduler(params);
        let (stop, signal) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(signal));
        *state = State::Running { stop, handle };
        Ok(())
    }

    /// Signal the loop to stop and wait for it to exit. A cycle already in
    /// progress runs to completion first. Does nothing when not running.
    ///
    /// Dropping the returned future before it completes leaves the loop
    /// stopping in the background; a later call picks up the wait.
    pub async fn stop_aggregation(&self) {
        let handle = {
            let mut state = self.lock();
            Self::reap(&mut state);
            match std::mem::replace(&mut *state, State::Stopping { handle: None }) {
                State::Running { stop, handle } => {
                    // The loop may already have exited on its own.
                    let _ = stop.send(true);
                    handle
                }
                State::Stopping {
                    handle: Some(handle),
                } => handle,
                other => {
                    *state = other;
                    return;
                }
            }
        };

        let mut waiting = StopGuard {
            state: &self.state,
            handle: Some(handle),
        };
        if let Some(handle) = waiting.handle.as_mut() {
            if let Err(e) = handle.await {
                tracing::error!("Aggregation task failed: {}", e);
            }
        }
    }

    /// Run a single cycle in the caller's task with the configured defaults.
    pub async fn run_once(&self) -> Result<CycleReport> {
        {
            let mut state = self.lock();
            Self::reap(&mut state);
            if !matches!(*state, State::Idle) {
                return Err(GatorError::AlreadyRunning);
            }
            *state = State::Cycle;
        }
        let _reset = CycleGuard(&self.state);

        self.scheduler(self.defaults.clone()).run_cycle().await
    }

    pub fn status(&self) -> AggregatorStatus {
        let mut state = self.lock();
        Self::reap(&mut state);
        match *state {
            State::Idle => AggregatorStatus::Idle,
            State::Running { .. } => AggregatorStatus::Running,
            State::Stopping { .. } => AggregatorStatus::Stopping,
            State::Cycle => AggregatorStatus::Cycle,
        }
    }

    /// True while the background loop is alive, including while stopping.
    pub fn is_running(&self) -> bool {
        matches!(
            self.status(),
            AggregatorStatus::Running | AggregatorStatus::Stopping
        )
    }

    fn scheduler(&self, params: AggregationParams) -> Scheduler<S> {
        Scheduler::new(
            self.store.clone(),
            self.fetcher.clone(),
            self.normalizer.clone(),
            params,
        )
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A loop that has exited counts as idle, whether it was told to stop
    /// or ended on its own.
    fn reap(state: &mut State) {
        let finished = match state {
            State::Running { handle, .. }
            | State::Stopping {
                handle: Some(handle),
            } => handle.is_finished(),
            _ => false,
        };
        if finished {
            *state = State::Idle;
        }
    }
}

/// Settles the state once a stop wait ends, completed or dropped.
struct StopGuard<'a> {
    state: &'a Mutex<State>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        let next = match self.handle.take() {
            Some(handle) if !handle.is_finished() => State::Stopping {
                handle: Some(handle),
            },
            _ => State::Idle,
        };
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

struct CycleGuard<'a>(&'a Mutex<State>);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = State::Idle;
    }
}
