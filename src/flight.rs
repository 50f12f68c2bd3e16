use crate::runway::RunwayId;
use crate::time::Minute;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use tabled::Tabled;

pub type FlightId = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightKind {
    #[serde(rename = "ATERRIZAJE", alias = "LANDING")]
    Landing,
    #[serde(rename = "DESPEGUE", alias = "DEPARTURE")]
    Departure,
}

impl fmt::Display for FlightKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FlightKind::Landing => write!(f, "LANDING"),
            FlightKind::Departure => write!(f, "DEPARTURE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Normal = 0,
    High = 1,
    Emergency = 2,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Normal),
            1 => Ok(Priority::High),
            2 => Ok(Priority::Emergency),
            other => Err(format!("priority must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Normal => write!(f, "NORMAL"),
            Priority::High => write!(f, "HIGH"),
            Priority::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightState {
    Pending,
    Queued,
    Assigned,
    Completed,
    Cancelled,
}

impl FlightState {
    /// Legal edges of the lifecycle:
    /// `Pending -> Queued -> Assigned -> Completed`, `Pending | Queued -> Cancelled`.
    pub fn can_transition_to(self, next: FlightState) -> bool {
        use FlightState::*;
        matches!(
            (self, next),
            (Pending, Queued)
                | (Queued, Assigned)
                | (Assigned, Completed)
                | (Pending, Cancelled)
                | (Queued, Cancelled)
        )
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlightState::Pending => "PENDING",
            FlightState::Queued => "QUEUED",
            FlightState::Assigned => "ASSIGNED",
            FlightState::Completed => "COMPLETED",
            FlightState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub kind: FlightKind,
    pub scheduled_time: Minute,
    pub priority: Priority,
    pub fuel: Option<u32>,
    pub state: FlightState,
    pub queued_at: Option<Minute>,
    pub assigned_at: Option<Minute>,
    pub completed_at: Option<Minute>,
    pub cancelled_at: Option<Minute>,
    pub runway_id: Option<RunwayId>,
}

impl Flight {
    pub fn landing(id: &str, eta: u64, priority: Priority, fuel: Option<u32>) -> Flight {
        Flight::new(Arc::from(id), FlightKind::Landing, Minute(eta), priority, fuel)
    }

    pub fn departure(id: &str, etd: u64, priority: Priority) -> Flight {
        Flight::new(Arc::from(id), FlightKind::Departure, Minute(etd), priority, None)
    }

    fn new(
        id: FlightId,
        kind: FlightKind,
        scheduled_time: Minute,
        priority: Priority,
        fuel: Option<u32>,
    ) -> Flight {
        Flight {
            id,
            kind,
            scheduled_time,
            priority,
            // departures never carry fuel
            fuel: fuel.filter(|_| kind == FlightKind::Landing),
            state: FlightState::Pending,
            queued_at: None,
            assigned_at: None,
            completed_at: None,
            cancelled_at: None,
            runway_id: None,
        }
    }

    pub fn is_landing(&self) -> bool {
        self.kind == FlightKind::Landing
    }

    pub fn is_emergency(&self) -> bool {
        self.priority == Priority::Emergency
    }

    /// Minutes between the scheduled time and the runway grant.
    pub fn wait_minutes(&self) -> Option<u64> {
        self.assigned_at.map(|at| at - self.scheduled_time)
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn display_minute(minute: Option<Minute>) -> String {
    minute.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One line of the console flight table.
#[derive(Tabled)]
pub struct FlightRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Sched")]
    pub scheduled: String,
    #[tabled(rename = "Priority")]
    pub priority: String,
    #[tabled(rename = "Fuel")]
    pub fuel: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Runway")]
    pub runway: String,
    #[tabled(rename = "Queued")]
    pub queued_at: String,
    #[tabled(rename = "Assigned")]
    pub assigned_at: String,
    #[tabled(rename = "Done")]
    pub finished_at: String,
}

impl From<&Flight> for FlightRow {
    fn from(flight: &Flight) -> Self {
        FlightRow {
            id: flight.id.to_string(),
            kind: flight.kind.to_string(),
            scheduled: flight.scheduled_time.to_string(),
            priority: flight.priority.to_string(),
            fuel: flight.fuel.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string()),
            state: flight.state.to_string(),
            runway: flight.runway_id.as_deref().unwrap_or("-").to_string(),
            queued_at: display_minute(flight.queued_at),
            assigned_at: display_minute(flight.assigned_at),
            finished_at: display_minute(flight.completed_at.or(flight.cancelled_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightState::{Assigned, Cancelled, Completed, Pending, Queued};

    #[test]
    fn test_lifecycle_edges() {
        assert!(Pending.can_transition_to(Queued));
        assert!(Queued.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Queued.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Assigned));
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Cancelled));
        assert!(!Assigned.can_transition_to(Queued));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Queued));
        assert!(!Queued.can_transition_to(Queued));
    }

    #[test]
    fn test_departure_drops_fuel() {
        let flight = Flight::new(Arc::from("UX303"), FlightKind::Departure, Minute(0), Priority::Normal, Some(9));
        assert_eq!(None, flight.fuel);
    }

    #[test]
    fn test_priority_wire_format() {
        assert_eq!(Priority::High, serde_json::from_str::<Priority>("1").unwrap());
        assert!(serde_json::from_str::<Priority>("3").is_err());
        assert_eq!("2", serde_json::to_string(&Priority::Emergency).unwrap());
    }

    #[test]
    fn test_kind_accepts_both_spellings() {
        assert_eq!(FlightKind::Landing, serde_json::from_str::<FlightKind>("\"ATERRIZAJE\"").unwrap());
        assert_eq!(FlightKind::Departure, serde_json::from_str::<FlightKind>("\"DEPARTURE\"").unwrap());
    }
}
