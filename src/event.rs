use crate::flight::{Flight, FlightId};
use crate::runway::{Occupation, RunwayId};
use crate::time::Minute;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Queued,
    Escalated,
    Cancelled,
    Assigned,
    Completed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Queued => "QUEUED",
            EventKind::Escalated => "ESCALATED",
            EventKind::Cancelled => "CANCELLED",
            EventKind::Assigned => "ASSIGNED",
            EventKind::Completed => "COMPLETED",
        };
        write!(f, "{}", label)
    }
}

/// One state change of one flight, stamped with the minute it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub minute: Minute,
    pub kind: EventKind,
    pub flight_id: FlightId,
    pub runway_id: Option<RunwayId>,
    pub detail: String,
}

impl Event {
    pub fn queued(minute: Minute, flight: &Flight) -> Event {
        Event {
            minute,
            kind: EventKind::Queued,
            flight_id: flight.id.clone(),
            runway_id: None,
            detail: format!("kind={} scheduled={}", flight.kind, flight.scheduled_time),
        }
    }

    pub fn escalated(minute: Minute, flight_id: &FlightId, fuel: u32) -> Event {
        Event {
            minute,
            kind: EventKind::Escalated,
            flight_id: flight_id.clone(),
            runway_id: None,
            detail: format!("priority=EMERGENCY reason=fuel<={}", fuel),
        }
    }

    pub fn cancelled(minute: Minute, flight_id: &FlightId) -> Event {
        Event {
            minute,
            kind: EventKind::Cancelled,
            flight_id: flight_id.clone(),
            runway_id: None,
            detail: "reason=fuel exhausted".to_string(),
        }
    }

    pub fn assigned(flight: &Flight, occupation: &Occupation) -> Event {
        Event {
            minute: occupation.assigned_at,
            kind: EventKind::Assigned,
            flight_id: flight.id.clone(),
            runway_id: Some(occupation.runway_id.clone()),
            detail: format!(
                "kind={} priority={} until={}",
                flight.kind, flight.priority, occupation.release_at
            ),
        }
    }

    pub fn completed(minute: Minute, occupation: &Occupation) -> Event {
        Event {
            minute,
            kind: EventKind::Completed,
            flight_id: occupation.flight_id.clone(),
            runway_id: Some(occupation.runway_id.clone()),
            detail: format!("held_since={}", occupation.assigned_at),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[Min {}] {} flight={}", self.minute, self.kind, self.flight_id)?;
        if let Some(runway_id) = &self.runway_id {
            write!(f, " runway={}", runway_id)?;
        }
        write!(f, " {}", self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::Priority;
    use std::sync::Arc;

    #[test]
    fn test_log_line_format() {
        let flight = Flight::landing("IB101", 0, Priority::Normal, Some(20));
        let occupation = Occupation {
            runway_id: Arc::from("R1"),
            flight_id: flight.id.clone(),
            assigned_at: Minute(2),
            release_at: Minute(5),
        };
        assert_eq!(
            "[Min 0002] ASSIGNED flight=IB101 runway=R1 kind=LANDING priority=NORMAL until=0005",
            Event::assigned(&flight, &occupation).to_string()
        );
        assert_eq!(
            "[Min 0003] CANCELLED flight=IB101 reason=fuel exhausted",
            Event::cancelled(Minute(3), &flight.id).to_string()
        );
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!("\"ESCALATED\"", serde_json::to_string(&EventKind::Escalated).unwrap());
    }
}
