use crate::error::EngineError;
use crate::flight::FlightId;
use crate::time::Minute;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use tabled::Tabled;

pub type RunwayId = Arc<str>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    pub id: RunwayId,
    pub category: String,
    pub service_duration: u64,
    pub enabled: bool,
}

impl Runway {
    pub fn new(id: &str, category: &str, service_duration: u64, enabled: bool) -> Runway {
        Runway {
            id: Arc::from(id),
            category: category.to_string(),
            service_duration,
            enabled,
        }
    }
}

impl fmt::Display for Runway {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A busy runway: `flight_id` holds `runway_id` until `release_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupation {
    pub runway_id: RunwayId,
    pub flight_id: FlightId,
    pub assigned_at: Minute,
    pub release_at: Minute,
}

/// Runway definitions plus the occupation currently held on each of them.
///
/// Occupations are indexed by runway position, so a second occupation on
/// the same runway is impossible to represent.
#[derive(Debug, Clone)]
pub struct RunwayPool {
    runways: Vec<Runway>,
    runways_index: HashMap<RunwayId, usize>,
    occupations: Vec<Option<Occupation>>,
    operations: Vec<u64>,
}

impl RunwayPool {
    pub fn new(runways: Vec<Runway>) -> RunwayPool {
        let runways_index = runways
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect::<HashMap<RunwayId, usize>>();
        let count = runways.len();
        RunwayPool {
            runways,
            runways_index,
            occupations: vec![None; count],
            operations: vec![0; count],
        }
    }

    pub fn runways(&self) -> &[Runway] {
        &self.runways
    }

    pub fn get(&self, runway_id: &RunwayId) -> Option<&Runway> {
        self.runways_index.get(runway_id).map(|i| &self.runways[*i])
    }

    /// Active occupations in runway declaration order.
    pub fn occupations(&self) -> impl Iterator<Item = &Occupation> {
        self.occupations.iter().flatten()
    }

    pub fn occupation(&self, runway_id: &RunwayId) -> Option<&Occupation> {
        self.runways_index
            .get(runway_id)
            .and_then(|i| self.occupations[*i].as_ref())
    }

    /// Enabled runways with no occupation, in declaration order.
    pub fn available(&self) -> Vec<RunwayId> {
        self.runways
            .iter()
            .zip(self.occupations.iter())
            .filter(|(runway, occupation)| runway.enabled && occupation.is_none())
            .map(|(runway, _)| runway.id.clone())
            .collect()
    }

    /// Remove and return every occupation due at or before `minute`.
    pub fn release(&mut self, minute: Minute) -> Vec<Occupation> {
        self.occupations
            .iter_mut()
            .filter(|slot| slot.as_ref().is_some_and(|o| o.release_at <= minute))
            .filter_map(|slot| slot.take())
            .collect()
    }

    /// Bind `flight_id` to `runway_id` from `minute` for the runway's service duration.
    ///
    /// # Errors
    ///
    /// Unknown, disabled or already occupied runways are an
    /// [`EngineError::InvariantViolation`].
    pub fn occupy(
        &mut self,
        runway_id: &RunwayId,
        flight_id: &FlightId,
        minute: Minute,
    ) -> Result<&Occupation, EngineError> {
        let idx = *self
            .runways_index
            .get(runway_id)
            .ok_or_else(|| EngineError::invariant(format!("unknown runway {}", runway_id)))?;
        let runway = &self.runways[idx];
        if !runway.enabled {
            return Err(EngineError::invariant(format!(
                "runway {} is disabled",
                runway_id
            )));
        }
        if let Some(existing) = &self.occupations[idx] {
            return Err(EngineError::invariant(format!(
                "runway {} already occupied by {} until {}",
                runway_id, existing.flight_id, existing.release_at
            )));
        }
        self.operations[idx] += 1;
        Ok(&*self.occupations[idx].insert(Occupation {
            runway_id: runway.id.clone(),
            flight_id: flight_id.clone(),
            assigned_at: minute,
            release_at: minute + runway.service_duration,
        }))
    }

    /// Number of assignments ever made on each runway, in declaration order.
    pub fn operation_counts(&self) -> Vec<(RunwayId, u64)> {
        self.runways
            .iter()
            .zip(self.operations.iter())
            .map(|(runway, count)| (runway.id.clone(), *count))
            .collect()
    }
}

/// One line of the console runway table.
#[derive(Tabled)]
pub struct RunwayRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Service (min)")]
    pub service_duration: u64,
    #[tabled(rename = "Enabled")]
    pub enabled: bool,
    #[tabled(rename = "Flight")]
    pub flight: String,
    #[tabled(rename = "Until")]
    pub release_at: String,
    #[tabled(rename = "Ops")]
    pub operations: u64,
}

impl RunwayPool {
    pub fn rows(&self) -> Vec<RunwayRow> {
        self.runways
            .iter()
            .zip(self.occupations.iter())
            .zip(self.operations.iter())
            .map(|((runway, occupation), operations)| RunwayRow {
                id: runway.id.to_string(),
                category: runway.category.clone(),
                service_duration: runway.service_duration,
                enabled: runway.enabled,
                flight: occupation.as_ref().map(|o| o.flight_id.to_string()).unwrap_or_else(|| "-".to_string()),
                release_at: occupation.as_ref().map(|o| o.release_at.to_string()).unwrap_or_else(|| "-".to_string()),
                operations: *operations,
            })
            .collect()
    }
}
