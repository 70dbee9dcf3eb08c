//! Per-item stopwatch.
//!
//! Elapsed time is always `now - started`, never an accumulated counter, so
//! it stays correct when the process is suspended. A sampling task publishes
//! the running value on a `watch` channel at the display cadence; it is torn
//! down on freeze, reset and drop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Reference display cadence.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Idle,
    Running { started: Instant },
    Frozen(Duration),
}

pub struct Timer {
    clock: Clock,
    tick: Duration,
    display: Arc<watch::Sender<Duration>>,
    sampler: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(tick: Duration) -> Self {
        let (display, _) = watch::channel(Duration::ZERO);
        Self {
            clock: Clock::Idle,
            tick: tick.max(Duration::from_millis(1)),
            display: Arc::new(display),
            sampler: None,
        }
    }

    /// Reset to zero and start sampling. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        self.stop_sampler();
        let started = Instant::now();
        self.clock = Clock::Running { started };
        self.display.send_replace(Duration::ZERO);

        let display = Arc::clone(&self.display);
        let tick = self.tick;
        self.sampler = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                display.send_replace(started.elapsed());
            }
        }));
    }

    /// Stop sampling and keep the current value. Freezing twice keeps the
    /// first value.
    pub fn freeze(&mut self) -> Duration {
        if let Clock::Running { started } = self.clock {
            let elapsed = started.elapsed();
            self.clock = Clock::Frozen(elapsed);
            self.stop_sampler();
            self.display.send_replace(elapsed);
            debug!(elapsed_ms = elapsed.as_millis() as u64, "timer frozen");
        }
        self.elapsed()
    }

    /// Stop sampling and go back to zero.
    pub fn reset(&mut self) {
        self.stop_sampler();
        self.clock = Clock::Idle;
        self.display.send_replace(Duration::ZERO);
    }

    pub fn elapsed(&self) -> Duration {
        match self.clock {
            Clock::Idle => Duration::ZERO,
            Clock::Running { started } => started.elapsed(),
            Clock::Frozen(elapsed) => elapsed,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.clock, Clock::Running { .. })
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.clock, Clock::Frozen(_))
    }

    /// True while the periodic sampling task is alive.
    pub fn is_sampling(&self) -> bool {
        self.sampler.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Receiver for display redraws at the sampling cadence.
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.display.subscribe()
    }

    fn stop_sampler(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.abort();
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop_sampler();
    }
}

/// Format a duration as `MM:SS.CC` (minutes grow past two digits if needed).
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let centis = (ms % 1000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}
