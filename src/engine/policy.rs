//! Runway assignment ranking.
//!
//! Every queued flight maps to a [`Rank`]; the smallest rank gets the next
//! free runway. Variant order encodes the tiers, field order the ordering
//! inside a tier:
//!
//! 1. emergency landings, least fuel first,
//! 2. emergency departures, earliest ETD first,
//! 3. any other landing, earliest ETA first,
//! 4. any other departure, earliest ETD first.
//!
//! Normal and High priority share tiers 3 and 4. Equal ranks keep queue order.

use crate::flight::{Flight, FlightKind};
use crate::time::Minute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    EmergencyLanding { fuel: u32 },
    EmergencyDeparture { etd: Minute },
    Landing { eta: Minute },
    Departure { etd: Minute },
}

impl Rank {
    pub fn of(flight: &Flight) -> Rank {
        match (flight.is_emergency(), flight.kind) {
            // a landing loaded as Emergency without fuel data sorts after all known fuel levels
            (true, FlightKind::Landing) => Rank::EmergencyLanding {
                fuel: flight.fuel.unwrap_or(u32::MAX),
            },
            (true, FlightKind::Departure) => Rank::EmergencyDeparture {
                etd: flight.scheduled_time,
            },
            (false, FlightKind::Landing) => Rank::Landing {
                eta: flight.scheduled_time,
            },
            (false, FlightKind::Departure) => Rank::Departure {
                etd: flight.scheduled_time,
            },
        }
    }
}

/// Pick the best-ranked flight; ties go to whichever comes first in `queued`.
pub fn select<'a>(queued: impl IntoIterator<Item = &'a Flight>) -> Option<&'a Flight> {
    queued.into_iter().min_by_key(|f| Rank::of(f))
}
