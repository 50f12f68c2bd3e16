//! Serial tick executors.
//!
//! A [`Driver`] is the only thing that calls [`SchedulingEngine::tick`]. It
//! holds the shared engine lock for exactly one tick at a time, publishes the
//! tick's events after releasing it, and checks its [`StopToken`] only
//! between ticks. A manual driver runs a fixed number of ticks back to back;
//! a timed driver waits `interval` of wall-clock time between ticks.

use crate::engine::SchedulingEngine;
use crate::error::EngineError;
use crate::sink::EventSink;
use crate::time::Minute;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub type SharedEngine = Arc<Mutex<SchedulingEngine>>;

/// Cooperative stop flag shared between a driver and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TickLimitReached,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub end_reason: EndReason,
    /// Ticks executed by this run.
    pub ticks: u64,
    /// Minute simulated by the last tick of this run.
    pub last_minute: Option<Minute>,
}

pub struct Driver {
    interval: Duration,
    max_ticks: Option<u64>,
    stop: StopToken,
}

impl Driver {
    /// Run `steps` ticks back to back.
    pub fn manual(steps: u64) -> Driver {
        Driver {
            interval: Duration::ZERO,
            max_ticks: Some(steps),
            stop: StopToken::new(),
        }
    }

    /// Run one tick every `interval` until `max_ticks` or a stop request.
    pub fn timed(interval: Duration, max_ticks: Option<u64>) -> Driver {
        Driver {
            interval,
            max_ticks,
            stop: StopToken::new(),
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    fn limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks.is_some_and(|max| ticks >= max)
    }

    /// Drive `engine` on the calling thread.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick and returns its error;
    /// [`EngineError::Poisoned`] if the engine lock is poisoned.
    pub fn run<S: EventSink + ?Sized>(
        &self,
        engine: &Mutex<SchedulingEngine>,
        sink: &mut S,
    ) -> Result<RunOutcome, EngineError> {
        let mut ticks: u64 = 0;
        let mut last_minute = None;

        info!(
            interval_ms = self.interval.as_millis() as u64,
            max_ticks = ?self.max_ticks,
            "Driver starting"
        );

        loop {
            let end_reason = if self.stop.is_stop_requested() {
                Some(EndReason::Stopped)
            } else if self.limit_reached(ticks) {
                Some(EndReason::TickLimitReached)
            } else {
                None
            };
            if let Some(end_reason) = end_reason {
                info!(reason = ?end_reason, ticks, "Driver finished");
                return Ok(RunOutcome {
                    end_reason,
                    ticks,
                    last_minute,
                });
            }

            let result = {
                let mut engine = engine.lock().map_err(|_| EngineError::Poisoned)?;
                engine.tick()?
            };
            ticks = ticks.saturating_add(1);
            last_minute = Some(result.minute);

            for event in &result.events {
                sink.publish(event);
            }
            debug!(minute = result.minute.0, events = result.events.len(), "Driver tick done");

            if !self.interval.is_zero() && !self.limit_reached(ticks) {
                self.pause();
            }
        }
    }

    fn pause(&self) {
        let deadline = Instant::now() + self.interval;
        loop {
            if self.stop.is_stop_requested() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            // woken early by RunningDriver::stop
            thread::park_timeout(deadline - now);
        }
    }

    /// Drive `engine` on a background thread. The sink travels with the
    /// thread and comes back from [`RunningDriver::stop`] or [`RunningDriver::wait`].
    pub fn spawn<S: EventSink + Send + 'static>(self, engine: SharedEngine, mut sink: S) -> RunningDriver<S> {
        let stop = self.stop.clone();
        let handle = thread::spawn(move || {
            let outcome = self.run(&engine, &mut sink);
            Finished { sink, outcome }
        });
        RunningDriver { stop, handle }
    }
}

pub struct Finished<S> {
    pub sink: S,
    pub outcome: Result<RunOutcome, EngineError>,
}

pub struct RunningDriver<S> {
    stop: StopToken,
    handle: JoinHandle<Finished<S>>,
}

impl<S> RunningDriver<S> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the driver to stop after its current tick and wait for it.
    /// Returns `None` if the driver thread panicked.
    pub fn stop(self) -> Option<Finished<S>> {
        self.stop.request_stop();
        self.handle.thread().unpark();
        self.wait()
    }

    /// Wait for the driver to end on its own.
    pub fn wait(self) -> Option<Finished<S>> {
        self.handle.join().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::event::Event;
    use crate::flight::Flight;
    use crate::flight::Priority::Normal;
    use crate::runway::Runway;

    fn engine() -> SharedEngine {
        Arc::new(Mutex::new(SchedulingEngine::new(
            vec![
                Flight::landing("IB101", 0, Normal, Some(20)),
                Flight::departure("UX303", 1, Normal),
            ],
            vec![Runway::new("R1", "long", 2, true)],
            EngineConfig::default(),
        )))
    }

    #[test]
    fn test_manual_driver_runs_exact_ticks() {
        let engine = engine();
        let mut events: Vec<Event> = vec![];
        let outcome = Driver::manual(3).run(&engine, &mut events).unwrap();

        assert_eq!(EndReason::TickLimitReached, outcome.end_reason);
        assert_eq!(3, outcome.ticks);
        assert_eq!(Some(Minute(2)), outcome.last_minute);
        assert_eq!(3, engine.lock().unwrap().ticks());
        assert!(!events.is_empty());
    }

    #[test]
    fn test_stop_before_start_runs_nothing() {
        let engine = engine();
        let driver = Driver::timed(Duration::from_millis(1), None);
        driver.stop_token().request_stop();
        let outcome = driver.run(&engine, &mut Vec::<Event>::new()).unwrap();

        assert_eq!(EndReason::Stopped, outcome.end_reason);
        assert_eq!(0, outcome.ticks);
        assert_eq!(0, engine.lock().unwrap().ticks());
    }

    #[test]
    fn test_stop_takes_effect_between_ticks() {
        let engine = engine();
        // long enough that the run can only end through the stop request
        let running = Driver::timed(Duration::from_secs(60), None).spawn(engine.clone(), Vec::<Event>::new());

        let started = Instant::now();
        while engine.lock().unwrap().ticks() == 0 {
            assert!(started.elapsed() < Duration::from_secs(10), "driver never ticked");
            thread::sleep(Duration::from_millis(5));
        }
        let snapshot = engine.lock().unwrap().snapshot();
        assert_eq!(Minute(0), snapshot.minute);

        let finished = running.stop().unwrap();
        let outcome = finished.outcome.unwrap();
        assert_eq!(EndReason::Stopped, outcome.end_reason);
        assert_eq!(1, outcome.ticks);
        assert_eq!(1, engine.lock().unwrap().ticks());
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(Some(Minute(0)), finished.sink.last().map(|e| e.minute));
    }

    #[test]
    fn test_spawned_driver_ends_at_tick_limit() {
        let engine = engine();
        let running = Driver::timed(Duration::from_millis(1), Some(4)).spawn(engine.clone(), Vec::<Event>::new());
        let finished = running.wait().unwrap();

        assert_eq!(EndReason::TickLimitReached, finished.outcome.unwrap().end_reason);
        assert_eq!(Minute(3), engine.lock().unwrap().minute());
    }
}
