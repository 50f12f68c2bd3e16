use crate::engine::{EngineConfig, SchedulingEngine, TickResult};
use crate::event::{Event, EventKind};
use crate::flight::{Flight, FlightId, Priority};
use crate::runway::Runway;
use proptest::prelude::*;
use std::sync::Arc;

pub fn id(s: &str) -> Arc<str> {
    Arc::from(s)
}

pub fn add_landing(flights: &mut Vec<Flight>, flight_id: &str, eta: u64, priority: Priority, fuel: Option<u32>) {
    flights.push(Flight::landing(flight_id, eta, priority, fuel));
}

pub fn add_departure(flights: &mut Vec<Flight>, flight_id: &str, etd: u64, priority: Priority) {
    flights.push(Flight::departure(flight_id, etd, priority));
}

pub fn add_runway(runways: &mut Vec<Runway>, runway_id: &str, service_duration: u64, enabled: bool) {
    runways.push(Runway::new(runway_id, "standard", service_duration, enabled));
}

pub fn engine(flights: Vec<Flight>, runways: Vec<Runway>) -> SchedulingEngine {
    SchedulingEngine::new(flights, runways, EngineConfig::default())
}

pub fn run_ticks(engine: &mut SchedulingEngine, ticks: u64) -> Vec<TickResult> {
    (0..ticks).map(|_| engine.tick().unwrap()).collect()
}

/// `(kind, flight, runway)` for every event, in emission order.
pub fn trace(events: &[Event]) -> Vec<(EventKind, FlightId, Option<Arc<str>>)> {
    events
        .iter()
        .map(|e| (e.kind, e.flight_id.clone(), e.runway_id.clone()))
        .collect()
}

pub fn flight<'a>(engine: &'a SchedulingEngine, flight_id: &str) -> &'a Flight {
    engine.registry().get(&id(flight_id)).unwrap()
}

pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Normal), Just(Priority::High), Just(Priority::Emergency)]
}

pub fn arb_flights() -> impl Strategy<Value = Vec<Flight>> {
    prop::collection::vec(
        (any::<bool>(), 0..12u64, arb_priority(), prop::option::of(0..15u32)),
        0..25,
    )
    .prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, (landing, at, priority, fuel))| {
                if landing {
                    Flight::landing(&format!("LD_{}", i), at, priority, fuel)
                } else {
                    Flight::departure(&format!("DP_{}", i), at, priority)
                }
            })
            .collect()
    })
}

pub fn arb_runways() -> impl Strategy<Value = Vec<Runway>> {
    prop::collection::vec((1..5u64, prop::bool::weighted(0.8)), 0..4).prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, (duration, enabled))| Runway::new(&format!("R{}", i + 1), "standard", duration, enabled))
            .collect()
    })
}
