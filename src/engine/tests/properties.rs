use crate::engine::tests::utils::{arb_flights, arb_runways, engine};
use crate::event::EventKind;
use crate::flight::FlightState::{Assigned, Cancelled, Completed, Pending, Queued};
use crate::flight::{FlightId, FlightKind, FlightState, Priority};
use proptest::prelude::*;
use proptest::proptest;
use std::collections::HashMap;

proptest! {
    #[test]
    fn test_lifecycle_and_runway_invariants(
        flights in arb_flights(),
        runways in arb_runways(),
        ticks in 1..30u64,
    ) {
        let total = flights.len();
        let mut engine = engine(flights, runways);
        let mut states: HashMap<FlightId, FlightState> = engine
            .registry()
            .flights()
            .iter()
            .map(|f| (f.id.clone(), Pending))
            .collect();
        let mut previous = engine.registry().flights().to_vec();

        for _ in 0..ticks {
            let result = engine.tick().unwrap();

            for event in &result.events {
                let next = match event.kind {
                    EventKind::Queued => Queued,
                    EventKind::Assigned => Assigned,
                    EventKind::Completed => Completed,
                    EventKind::Cancelled => Cancelled,
                    EventKind::Escalated => continue,
                };
                let current = states[&event.flight_id];
                prop_assert!(
                    current.can_transition_to(next),
                    "\nIllegal transition at {}:\nFlight {} went {} -> {}",
                    result.minute, event.flight_id, current, next
                );
                states.insert(event.flight_id.clone(), next);
            }

            for (before, after) in previous.iter().zip(engine.registry().flights()) {
                prop_assert_eq!(states[&after.id], after.state);
                if let (Some(was), Some(now)) = (before.fuel, after.fuel) {
                    prop_assert!(now <= was, "\nFuel of {} went up from {} to {}", after.id, was, now);
                }
                prop_assert!(
                    before.priority != Priority::Emergency || after.priority == Priority::Emergency,
                    "\nFlight {} lost its Emergency priority", after.id
                );
                if after.kind == FlightKind::Departure {
                    prop_assert_eq!(None, after.fuel);
                }
                if after.state == Cancelled {
                    prop_assert_eq!(None, after.assigned_at);
                    prop_assert!(after.runway_id.is_none());
                }
            }

            let snapshot = &result.snapshot;
            prop_assert_eq!(snapshot.assigned_flights.len(), snapshot.occupations.len());
            for occupation in &snapshot.occupations {
                let runway = engine.pool().get(&occupation.runway_id).unwrap();
                prop_assert!(runway.enabled, "\nDisabled runway {} is busy", runway.id);
                prop_assert_eq!(occupation.release_at, occupation.assigned_at + runway.service_duration);

                let holders = snapshot
                    .assigned_flights
                    .iter()
                    .filter(|f| f.runway_id.as_ref() == Some(&occupation.runway_id))
                    .count();
                prop_assert_eq!(1, holders, "\nRunway {} has {} holders", occupation.runway_id, holders);
            }
            prop_assert!(snapshot.landing_queue.iter().all(|f| f.kind == FlightKind::Landing && f.state == Queued));
            prop_assert!(snapshot.departure_queue.iter().all(|f| f.kind == FlightKind::Departure && f.state == Queued));

            previous = engine.registry().flights().to_vec();
        }

        let report = engine.report();
        prop_assert_eq!(ticks, report.total_minutes);
        prop_assert!(report.completed_count + report.cancelled_count <= total);
        let operations: u64 = report.per_runway_operation_count.iter().map(|u| u.operations).sum();
        prop_assert!(operations as usize >= report.completed_count);
        prop_assert_eq!(report.clone(), engine.report());
    }
}
