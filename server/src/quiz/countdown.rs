//! One-slot per-question countdown.
//!
//! At most one ticking task exists per [`Countdown`]. Every (re)start bumps a
//! generation counter that is stamped on each tick, so a consumer can drop
//! ticks that were already queued by an instance that has since been replaced.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub generation: u64,
    pub time_left: u32,
    pub duration: u32,
}

#[derive(Debug)]
pub struct Countdown {
    tick_tx: mpsc::Sender<CountdownTick>,
    generation: u64,
    running: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Creates an idle countdown and the receiver its ticks are delivered to.
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<CountdownTick>) {
        let (tick_tx, tick_rx) = mpsc::channel(buffer_size.max(1));
        let countdown = Self {
            tick_tx,
            generation: 0,
            running: None,
        };
        (countdown, tick_rx)
    }

    pub fn start(&mut self, duration: u32) {
        self.resume(duration, duration);
    }

    /// Starts ticking down from `time_left`. Any running instance is stopped
    /// first.
    pub fn resume(&mut self, time_left: u32, duration: u32) {
        self.stop();
        self.generation += 1;

        tracing::trace!(
            countdown.generation = self.generation,
            countdown.time_left = time_left,
            countdown.duration = duration,
            "Starting countdown"
        );
        self.running = Some(tokio::spawn(run_countdown(
            self.tick_tx.clone(),
            self.generation,
            time_left.min(duration),
            duration,
        )));
    }

    pub fn pause(&mut self) {
        self.stop();
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.abort();
        }
    }

    /// Whether `tick` was produced by the instance started last and that
    /// instance has not been stopped since.
    pub fn is_current(&self, tick: &CountdownTick) -> bool {
        self.running.is_some() && tick.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(
    tick_tx: mpsc::Sender<CountdownTick>,
    generation: u64,
    mut time_left: u32,
    duration: u32,
) {
    if time_left == 0 {
        let _ = tick_tx
            .send(CountdownTick {
                generation,
                time_left,
                duration,
            })
            .await;
        return;
    }

    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    while time_left > 0 {
        ticker.tick().await;
        time_left -= 1;
        let tick = CountdownTick {
            generation,
            time_left,
            duration,
        };
        if tick_tx.send(tick).await.is_err() {
            tracing::debug!(countdown.generation = generation, "Countdown receiver dropped");
            break;
        }
    }
}
