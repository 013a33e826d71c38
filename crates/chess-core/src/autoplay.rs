//! Repeating timers for autoplay.
//!
//! A [`Timer`] does not call into the controller. Each registration gets a
//! [`TimerId`] and its ticks are delivered as that id to whoever owns the
//! controller, which forwards them to `ReplayController::on_tick`. Ticks are
//! therefore serialized with every other mutation, and a tick whose id no
//! longer matches the live handle is ignored.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub type TimerId = u64;

pub trait Timer: Send {
    /// Register a repeating tick every `period`. The first tick fires one period from now.
    fn every(&mut self, period: Duration) -> TimerHandle;
}

/// Owned registration of a repeating timer. Cancels on drop.
pub struct TimerHandle {
    id: TimerId,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(id: TimerId, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").field("id", &self.id).finish()
    }
}

/// Timer backed by a tokio interval task per registration.
///
/// Must be used from inside a tokio runtime.
pub struct TokioTimer {
    ticks: mpsc::UnboundedSender<TimerId>,
    next_id: TimerId,
}

impl TokioTimer {
    pub fn new(ticks: mpsc::UnboundedSender<TimerId>) -> Self {
        Self { ticks, next_id: 0 }
    }
}

impl Timer for TokioTimer {
    fn every(&mut self, period: Duration) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        let ticks = self.ticks.clone();

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(id).is_err() {
                    break;
                }
            }
        });

        TimerHandle::new(id, move || task.abort())
    }
}

#[derive(Default)]
struct ManualState {
    next_id: TimerId,
    live: Vec<(TimerId, Duration)>,
}

/// Deterministic timer: records registrations and lets the caller decide when ticks happen.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of registrations that have not been cancelled, oldest first.
    pub fn live(&self) -> Vec<TimerId> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.live.iter().map(|(id, _)| *id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).live.len()
    }

    pub fn period(&self, id: TimerId) -> Option<Duration> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.live.iter().find(|(live, _)| *live == id).map(|(_, p)| *p)
    }
}

impl Timer for ManualTimer {
    fn every(&mut self, period: Duration) -> TimerHandle {
        let id = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.next_id += 1;
            let id = state.next_id;
            state.live.push((id, period));
            id
        };

        let shared = Arc::clone(&self.state);
        TimerHandle::new(id, move || {
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            state.live.retain(|(live, _)| *live != id);
        })
    }
}
