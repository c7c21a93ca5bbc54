//! Background scheduler loop

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::Controller;
use sprinkler_calendar::EventSource;

/// Floor for the polling interval, so a misconfigured delay cannot hammer
/// the calendar source.
pub const MIN_QUERY_DELAY: Duration = Duration::from_secs(10);

/// Lifecycle of the scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Terminated = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Running,
            2 => LoopState::Stopping,
            3 => LoopState::Terminated,
            _ => LoopState::Idle,
        }
    }
}

/// Handle for observing and stopping a running [`SchedulerLoop`]
#[derive(Clone)]
pub struct LoopHandle {
    delay_seconds: Arc<AtomicU64>,
    state: Arc<AtomicU8>,
}

impl LoopHandle {
    /// Request shutdown. The loop sleeps in one-second slices, so this is
    /// observed within about a second rather than a full polling interval.
    pub fn stop(&self) {
        self.delay_seconds.store(0, Ordering::SeqCst);

        let _ = self.state.compare_exchange(
            LoopState::Running as u8,
            LoopState::Stopping as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// Polls the calendar source on interval and reconciles the controller.
///
/// Every tick also sweeps manually activated zones past the max-run
/// cutoff, so the safety net holds even with no calendar configured.
pub struct SchedulerLoop {
    controller: Arc<Mutex<Controller>>,
    source: Arc<dyn EventSource>,
    delay_seconds: Arc<AtomicU64>,
    state: Arc<AtomicU8>,
}

impl SchedulerLoop {
    pub fn new(
        controller: Arc<Mutex<Controller>>,
        source: Arc<dyn EventSource>,
        query_delay: Duration,
    ) -> Self {
        let delay = if query_delay < MIN_QUERY_DELAY {
            warn!(
                configured = query_delay.as_secs(),
                floor = MIN_QUERY_DELAY.as_secs(),
                "Query delay below floor, clamping"
            );
            MIN_QUERY_DELAY
        } else {
            query_delay
        };

        Self {
            controller,
            source,
            delay_seconds: Arc::new(AtomicU64::new(delay.as_secs())),
            state: Arc::new(AtomicU8::new(LoopState::Idle as u8)),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            delay_seconds: self.delay_seconds.clone(),
            state: self.state.clone(),
        }
    }

    /// Run until [`LoopHandle::stop`] is observed.
    ///
    /// A failed tick is logged and the loop proceeds to its next sleep
    /// cycle; the next tick retries independently.
    pub async fn run(self) {
        self.state
            .store(LoopState::Running as u8, Ordering::SeqCst);
        info!(
            delay = self.delay_seconds.load(Ordering::SeqCst),
            "Scheduler loop started"
        );

        while self.delay_seconds.load(Ordering::SeqCst) > 0 {
            self.tick().await;

            // Sleep in one-second slices so stop() cancels promptly.
            let mut slept = 0;
            while slept < self.delay_seconds.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(1)).await;
                slept += 1;
            }
        }

        self.state
            .store(LoopState::Terminated as u8, Ordering::SeqCst);
        info!("Scheduler loop terminated");
    }

    async fn tick(&self) {
        // The max-run sweep runs regardless of calendar configuration.
        {
            let mut controller = self.controller.lock().await;
            controller.sweep_long_running();
        }

        let Some(calendar_id) = self.controller.lock().await.calendar_id() else {
            return;
        };
        if calendar_id.is_empty() {
            return;
        }

        // Fetch without holding the controller lock; manual commands stay
        // responsive during slow calendar calls.
        let events = match self.source.fetch_events(&calendar_id).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Calendar fetch failed, skipping this tick");
                return;
            }
        };

        debug!(count = events.len(), "Reconciling fetched events");
        self.controller.lock().await.reconcile(&events);
    }
}
