//! The scheduling engine: one call to [`SchedulingEngine::tick`] simulates
//! one virtual minute.
//!
//! Each tick runs four steps in a fixed order:
//!
//! 1. **Fuel** -- queued landings burn a minute of fuel; they are escalated
//!    to Emergency at the threshold and cancelled when fuel runs out.
//! 2. **Admission** -- pending flights whose scheduled time has come join
//!    the landing or departure queue.
//! 3. **Release** -- occupations that reached their release minute free
//!    their runway and complete their flight.
//! 4. **Assignment** -- free runways, in declaration order, each take the
//!    best-ranked queued flight (see [`policy`]).
//!
//! Admission precedes assignment, so a flight can be queued and granted a
//! runway in the same minute. Release precedes assignment, so a runway freed
//! this minute is available again this minute.

pub mod policy;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::event::Event;
use crate::flight::FlightState::{Assigned, Cancelled, Completed, Queued};
use crate::flight::{Flight, FlightState};
use crate::registry::{FlightRegistry, FuelOutcome};
use crate::report::Report;
use crate::runway::{Occupation, Runway, RunwayPool};
use crate::time::Minute;
use serde::Serialize;
use tracing::{debug, info};

/// Fuel level (minutes) at or below which a waiting landing becomes an emergency.
pub const DEFAULT_FUEL_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub fuel_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            fuel_threshold: DEFAULT_FUEL_THRESHOLD,
        }
    }
}

/// Read-only copy of the engine state taken between two ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub minute: Minute,
    pub landing_queue: Vec<Flight>,
    pub departure_queue: Vec<Flight>,
    pub assigned_flights: Vec<Flight>,
    pub completed_flights: Vec<Flight>,
    pub cancelled_flights: Vec<Flight>,
    pub occupations: Vec<Occupation>,
}

/// Everything one tick produced: the minute it simulated, the state changes
/// in the order they happened, and the state right after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickResult {
    pub minute: Minute,
    pub events: Vec<Event>,
    pub snapshot: Snapshot,
}

pub struct SchedulingEngine {
    config: EngineConfig,
    clock: Clock,
    ticks: u64,
    registry: FlightRegistry,
    pool: RunwayPool,
}

impl SchedulingEngine {
    pub fn new(flights: Vec<Flight>, runways: Vec<Runway>, config: EngineConfig) -> SchedulingEngine {
        SchedulingEngine {
            config,
            clock: Clock::new(),
            ticks: 0,
            registry: FlightRegistry::new(flights),
            pool: RunwayPool::new(runways),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Minute of the last executed tick (0 before the first one).
    pub fn minute(&self) -> Minute {
        self.clock.now()
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn registry(&self) -> &FlightRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &RunwayPool {
        &self.pool
    }

    /// Simulate one minute.
    ///
    /// The first tick simulates minute 0; every later tick first advances
    /// the clock by one minute.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvariantViolation`] when registry and pool disagree,
    /// [`EngineError::Clock`] when the clock cannot advance.
    pub fn tick(&mut self) -> Result<TickResult, EngineError> {
        if self.ticks > 0 {
            self.clock.advance()?;
        }
        let minute = self.clock.now();
        let mut events = vec![];

        self.update_fuel(minute, &mut events)?;
        self.admit(minute, &mut events)?;
        self.release(minute, &mut events)?;
        self.assign(minute, &mut events)?;

        self.ticks += 1;
        self.assert_invariants();

        let snapshot = self.snapshot();
        info!(
            minute = minute.0,
            events = events.len(),
            landing_queue = snapshot.landing_queue.len(),
            departure_queue = snapshot.departure_queue.len(),
            busy_runways = snapshot.occupations.len(),
            "Tick completed"
        );
        Ok(TickResult {
            minute,
            events,
            snapshot,
        })
    }

    fn update_fuel(&mut self, minute: Minute, events: &mut Vec<Event>) -> Result<(), EngineError> {
        for outcome in self.registry.burn_fuel(minute, self.config.fuel_threshold)? {
            events.push(Self::fuel_event(minute, &outcome));
        }
        Ok(())
    }

    fn admit(&mut self, minute: Minute, events: &mut Vec<Event>) -> Result<(), EngineError> {
        for flight_id in self.registry.admit_due(minute)? {
            let flight = self
                .registry
                .get(&flight_id)
                .ok_or_else(|| EngineError::invariant(format!("admitted unknown flight {}", flight_id)))?;
            events.push(Event::queued(minute, flight));

            // fuel is not burned on the admission minute, but a landing that
            // arrives already short of fuel is handled before assignment
            if flight.is_landing() && flight.fuel == Some(0) {
                self.registry.transition(&flight_id, Cancelled, minute)?;
                events.push(Event::cancelled(minute, &flight_id));
            } else if let Some(outcome) = self
                .registry
                .escalate_if_low(&flight_id, self.config.fuel_threshold)?
            {
                events.push(Self::fuel_event(minute, &outcome));
            }
        }
        Ok(())
    }

    fn release(&mut self, minute: Minute, events: &mut Vec<Event>) -> Result<(), EngineError> {
        for occupation in self.pool.release(minute) {
            let holder = self.registry.get(&occupation.flight_id).ok_or_else(|| {
                EngineError::invariant(format!(
                    "runway {} held by unknown flight {}",
                    occupation.runway_id, occupation.flight_id
                ))
            })?;
            if holder.runway_id.as_ref() != Some(&occupation.runway_id) {
                return Err(EngineError::invariant(format!(
                    "flight {} released from runway {} it was never assigned to",
                    occupation.flight_id, occupation.runway_id
                )));
            }
            self.registry
                .transition(&occupation.flight_id, Completed, minute)?;
            debug!(
                minute = minute.0,
                flight = %occupation.flight_id,
                runway = %occupation.runway_id,
                "Runway released"
            );
            events.push(Event::completed(minute, &occupation));
        }
        Ok(())
    }

    fn assign(&mut self, minute: Minute, events: &mut Vec<Event>) -> Result<(), EngineError> {
        for runway_id in self.pool.available() {
            let Some(flight_id) = policy::select(self.registry.queued()).map(|f| f.id.clone()) else {
                debug!(minute = minute.0, runway = %runway_id, "No queued flight for free runway");
                break;
            };
            self.registry.transition(&flight_id, Assigned, minute)?;
            self.registry.set_runway(&flight_id, &runway_id)?;
            let occupation = self.pool.occupy(&runway_id, &flight_id, minute)?;
            let flight = self
                .registry
                .get(&flight_id)
                .ok_or_else(|| EngineError::invariant(format!("assigned unknown flight {}", flight_id)))?;
            events.push(Event::assigned(flight, occupation));
        }
        Ok(())
    }

    fn fuel_event(minute: Minute, outcome: &FuelOutcome) -> Event {
        match outcome {
            FuelOutcome::Escalated { flight_id, fuel } => Event::escalated(minute, flight_id, *fuel),
            FuelOutcome::Cancelled { flight_id } => Event::cancelled(minute, flight_id),
        }
    }

    fn collect(&self, state: FlightState) -> Vec<Flight> {
        self.registry.in_state(state).cloned().collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            minute: self.clock.now(),
            landing_queue: self.registry.landing_queue().cloned().collect(),
            departure_queue: self.registry.departure_queue().cloned().collect(),
            assigned_flights: self.collect(Assigned),
            completed_flights: self.collect(Completed),
            cancelled_flights: self.collect(Cancelled),
            occupations: self.pool.occupations().cloned().collect(),
        }
    }

    /// Summary statistics; reads state only, so repeated calls agree.
    pub fn report(&self) -> Report {
        Report::build(self.ticks, &self.registry, &self.pool)
    }

    /// Flights waiting in either queue.
    pub fn queued_count(&self) -> usize {
        self.registry.in_state(Queued).count()
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        self.registry.assert_invariants();
        debug_assert!(
            self.pool.occupations().all(|o| {
                self.registry
                    .get(&o.flight_id)
                    .is_some_and(|f| f.state == Assigned && f.runway_id.as_ref() == Some(&o.runway_id))
            }),
            "Occupation <-> assigned flight invariant violated"
        );
        debug_assert_eq!(
            self.registry.in_state(Assigned).count(),
            self.pool.occupations().count(),
            "Every assigned flight holds exactly one runway invariant violated"
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    mod pipeline;
    mod properties;
    mod scenario;
    mod utils;
}
