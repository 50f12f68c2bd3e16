use crate::error::EngineError;
use crate::flight::FlightState::{Assigned, Cancelled, Completed, Pending, Queued};
use crate::flight::{Flight, FlightId, FlightKind, FlightState, Priority};
use crate::runway::RunwayId;
use crate::time::Minute;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Outcome of one fuel burn on a queued landing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuelOutcome {
    /// Fuel dropped to the threshold or below; priority is now Emergency.
    Escalated { flight_id: FlightId, fuel: u32 },
    /// Fuel ran out; the flight left the landing queue for good.
    Cancelled { flight_id: FlightId },
}

/// Every flight of the scenario plus the two waiting queues.
///
/// All state changes go through [`FlightRegistry::transition`], which refuses
/// any edge the lifecycle does not allow.
pub struct FlightRegistry {
    flights: Vec<Flight>,
    flights_index: HashMap<FlightId, usize>,
    landing_queue: VecDeque<FlightId>,
    departure_queue: VecDeque<FlightId>,
}

impl FlightRegistry {
    /// Takes flights in load order. Whatever state the records carry, every
    /// flight starts `Pending` with no timestamps.
    pub fn new(mut flights: Vec<Flight>) -> FlightRegistry {
        flights.iter_mut().for_each(|f| {
            f.state = Pending;
            f.queued_at = None;
            f.assigned_at = None;
            f.completed_at = None;
            f.cancelled_at = None;
            f.runway_id = None;
        });
        let flights_index = flights
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect::<HashMap<FlightId, usize>>();
        FlightRegistry {
            flights,
            flights_index,
            landing_queue: VecDeque::new(),
            departure_queue: VecDeque::new(),
        }
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn get(&self, flight_id: &FlightId) -> Option<&Flight> {
        self.flights_index.get(flight_id).map(|i| &self.flights[*i])
    }

    pub fn landing_queue(&self) -> impl Iterator<Item = &Flight> {
        self.landing_queue.iter().filter_map(move |id| self.get(id))
    }

    pub fn departure_queue(&self) -> impl Iterator<Item = &Flight> {
        self.departure_queue.iter().filter_map(move |id| self.get(id))
    }

    /// Queued flights, landing queue first, each queue in arrival order.
    pub fn queued(&self) -> impl Iterator<Item = &Flight> {
        self.landing_queue().chain(self.departure_queue())
    }

    pub fn in_state(&self, state: FlightState) -> impl Iterator<Item = &Flight> {
        self.flights.iter().filter(move |f| f.state == state)
    }

    fn index_of(&self, flight_id: &FlightId) -> Result<usize, EngineError> {
        self.flights_index
            .get(flight_id)
            .copied()
            .ok_or_else(|| EngineError::invariant(format!("unknown flight {}", flight_id)))
    }

    /// Move a flight along one edge of its lifecycle, stamping the matching
    /// timestamp and keeping the queues in sync.
    pub fn transition(
        &mut self,
        flight_id: &FlightId,
        next: FlightState,
        minute: Minute,
    ) -> Result<(), EngineError> {
        let idx = self.index_of(flight_id)?;
        let current = self.flights[idx].state;
        if !current.can_transition_to(next) {
            return Err(EngineError::invariant(format!(
                "flight {} cannot go from {} to {}",
                flight_id, current, next
            )));
        }

        if current == Queued {
            self.dequeue(idx);
        }

        let flight = &mut self.flights[idx];
        flight.state = next;
        match next {
            Queued => {
                flight.queued_at = Some(minute);
                match flight.kind {
                    FlightKind::Landing => self.landing_queue.push_back(flight.id.clone()),
                    FlightKind::Departure => self.departure_queue.push_back(flight.id.clone()),
                }
            }
            Assigned => flight.assigned_at = Some(minute),
            Completed => flight.completed_at = Some(minute),
            Cancelled => flight.cancelled_at = Some(minute),
            Pending => {}
        }
        debug!(flight = %flight_id, from = %current, to = %next, minute = minute.0, "Flight transition");
        Ok(())
    }

    fn dequeue(&mut self, idx: usize) {
        let flight = &self.flights[idx];
        let queue = match flight.kind {
            FlightKind::Landing => &mut self.landing_queue,
            FlightKind::Departure => &mut self.departure_queue,
        };
        queue.retain(|id| *id != flight.id);
    }

    /// Queue every pending flight whose scheduled time has come, in load order.
    pub fn admit_due(&mut self, minute: Minute) -> Result<Vec<FlightId>, EngineError> {
        let due = self
            .flights
            .iter()
            .filter(|f| f.state == Pending && f.scheduled_time <= minute)
            .map(|f| f.id.clone())
            .collect::<Vec<FlightId>>();
        for flight_id in &due {
            self.transition(flight_id, Queued, minute)?;
        }
        Ok(due)
    }

    /// Burn one minute of fuel on every queued landing that carries fuel.
    ///
    /// A landing that reaches zero is cancelled; one that reaches `threshold`
    /// or below is escalated to Emergency unless it already is.
    pub fn burn_fuel(&mut self, minute: Minute, threshold: u32) -> Result<Vec<FuelOutcome>, EngineError> {
        let burning = self
            .landing_queue
            .iter()
            .filter(|id| self.get(id).is_some_and(|f| f.fuel.is_some()))
            .cloned()
            .collect::<Vec<FlightId>>();

        let mut outcomes = vec![];
        for flight_id in burning {
            let idx = self.index_of(&flight_id)?;
            let flight = &mut self.flights[idx];
            let fuel = flight.fuel.map(|f| f.saturating_sub(1)).unwrap_or(0);
            flight.fuel = Some(fuel);
            if fuel == 0 {
                self.transition(&flight_id, Cancelled, minute)?;
                outcomes.push(FuelOutcome::Cancelled { flight_id });
            } else if let Some(outcome) = self.check_fuel(idx, threshold) {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    /// Escalate a landing whose fuel is already at or under `threshold`.
    /// Returns `None` when nothing changed.
    pub fn escalate_if_low(&mut self, flight_id: &FlightId, threshold: u32) -> Result<Option<FuelOutcome>, EngineError> {
        let idx = self.index_of(flight_id)?;
        Ok(self.check_fuel(idx, threshold))
    }

    fn check_fuel(&mut self, idx: usize, threshold: u32) -> Option<FuelOutcome> {
        let flight = &mut self.flights[idx];
        match flight.fuel {
            Some(fuel) if flight.is_landing() && fuel <= threshold && !flight.is_emergency() => {
                flight.priority = Priority::Emergency;
                Some(FuelOutcome::Escalated {
                    flight_id: flight.id.clone(),
                    fuel,
                })
            }
            _ => None,
        }
    }

    pub fn set_runway(&mut self, flight_id: &FlightId, runway_id: &RunwayId) -> Result<(), EngineError> {
        let idx = self.index_of(flight_id)?;
        self.flights[idx].runway_id = Some(runway_id.clone());
        Ok(())
    }

    #[cfg(debug_assertions)]
    pub(crate) fn assert_invariants(&self) {
        debug_assert!(
            self.flights.iter().all(|f| {
                let in_landing = self.landing_queue.contains(&f.id);
                let in_departure = self.departure_queue.contains(&f.id);
                match f.state {
                    Queued => in_landing ^ in_departure,
                    _ => !in_landing && !in_departure,
                }
            }),
            "Queue membership <-> Queued state invariant violated"
        );
        debug_assert!(
            self.flights
                .iter()
                .filter(|f| f.kind == FlightKind::Departure)
                .all(|f| f.fuel.is_none()),
            "Departure carries no fuel invariant violated"
        );
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn assert_invariants(&self) {}
}
