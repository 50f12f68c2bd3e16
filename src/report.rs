use crate::flight::FlightState::{Cancelled, Completed};
use crate::flight::{FlightId, FlightKind};
use crate::registry::FlightRegistry;
use crate::runway::{RunwayId, RunwayPool};
use crate::time::Minute;
use serde::Serialize;
use std::fmt;
use std::fmt::Formatter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunwayUsage {
    pub runway_id: RunwayId,
    pub operations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedFlight {
    pub id: FlightId,
    pub kind: FlightKind,
    pub emergency: bool,
    pub runway_id: Option<RunwayId>,
    pub started_at: Minute,
    pub finished_at: Minute,
}

/// End-of-run summary, derived from registry and pool state only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_minutes: u64,
    pub completed_count: usize,
    pub cancelled_count: usize,
    /// Mean of `assigned_at - scheduled_time` over completed flights.
    pub avg_wait_minutes: f64,
    pub per_runway_operation_count: Vec<RunwayUsage>,
    /// Completed flights that ended with Emergency priority.
    pub emergency_count: usize,
    pub completed: Vec<CompletedFlight>,
}

impl Report {
    pub fn build(total_minutes: u64, registry: &FlightRegistry, pool: &RunwayPool) -> Report {
        let mut done = registry.in_state(Completed).collect::<Vec<_>>();
        // stable: same-minute completions keep load order
        done.sort_by_key(|f| f.completed_at);

        let waits = done.iter().filter_map(|f| f.wait_minutes()).collect::<Vec<u64>>();
        let avg_wait_minutes = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<u64>() as f64 / waits.len() as f64
        };

        let completed = done
            .iter()
            .filter_map(|f| {
                Some(CompletedFlight {
                    id: f.id.clone(),
                    kind: f.kind,
                    emergency: f.is_emergency(),
                    runway_id: f.runway_id.clone(),
                    started_at: f.assigned_at?,
                    finished_at: f.completed_at?,
                })
            })
            .collect::<Vec<_>>();

        Report {
            total_minutes,
            completed_count: done.len(),
            cancelled_count: registry.in_state(Cancelled).count(),
            avg_wait_minutes,
            per_runway_operation_count: pool
                .operation_counts()
                .into_iter()
                .map(|(runway_id, operations)| RunwayUsage {
                    runway_id,
                    operations,
                })
                .collect(),
            emergency_count: done.iter().filter(|f| f.is_emergency()).count(),
            completed,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "SUMMARY")?;
        writeln!(f, "- Simulated time (min): {}", self.total_minutes)?;
        writeln!(f, "- Flights served: {}", self.completed_count)?;
        writeln!(f, "- Flights cancelled: {}", self.cancelled_count)?;
        writeln!(f, "- Average wait (min): {:.1}", self.avg_wait_minutes)?;
        for usage in &self.per_runway_operation_count {
            writeln!(f, "- Runway usage: {}={} operations", usage.runway_id, usage.operations)?;
        }
        writeln!(f, "- Emergencies handled: {}", self.emergency_count)?;
        writeln!(f, "- Completed flights:")?;
        for flight in &self.completed {
            let emergency = if flight.emergency { ", EMERGENCY" } else { "" };
            writeln!(
                f,
                "  * {} ({}{}) runway={} start={} end={}",
                flight.id,
                flight.kind,
                emergency,
                flight.runway_id.as_deref().unwrap_or("-"),
                flight.started_at,
                flight.finished_at
            )?;
        }
        Ok(())
    }
}
