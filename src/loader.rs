//! Scenario loading.
//!
//! A scenario is a JSON object with a `runways` and a `flights` array. Each
//! record is decoded and checked on its own: a bad record becomes a
//! [`LoadError::InvalidRecord`] warning and the rest of the file still loads.
//! Field names from the legacy CSV headers (`id_pista`, `tiempo_uso`,
//! `tipo`, `combustible`, ...) are accepted as aliases.

use crate::error::LoadError;
use crate::flight::{Flight, FlightKind, Priority};
use crate::runway::Runway;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

pub struct Scenario {
    pub runways: Vec<Runway>,
    pub flights: Vec<Flight>,
    /// Records that were skipped, in file order.
    pub warnings: Vec<LoadError>,
}

#[derive(Deserialize)]
struct RawScenario {
    #[serde(default, alias = "pistas")]
    runways: Vec<Value>,
    #[serde(default, alias = "vuelos")]
    flights: Vec<Value>,
}

#[derive(Deserialize)]
struct RawRunway {
    #[serde(alias = "id_pista")]
    id: String,
    #[serde(default, alias = "categoria")]
    category: String,
    #[serde(alias = "tiempo_uso")]
    service_duration: i64,
    #[serde(default, alias = "habilitada")]
    enabled: Option<Flag>,
}

/// `true`/`false`, `1`/`0` or their string forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Flag {
    fn as_bool(&self) -> Result<bool, String> {
        match self {
            Flag::Bool(b) => Ok(*b),
            Flag::Int(1) => Ok(true),
            Flag::Int(0) => Ok(false),
            Flag::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                other => Err(format!("enabled flag must be 0/1 or true/false, got {:?}", other)),
            },
            Flag::Int(other) => Err(format!("enabled flag must be 0/1 or true/false, got {}", other)),
        }
    }
}

#[derive(Deserialize)]
struct RawFlight {
    id: String,
    #[serde(alias = "tipo")]
    kind: FlightKind,
    eta: Option<i64>,
    etd: Option<i64>,
    #[serde(alias = "prioridad")]
    priority: i64,
    #[serde(alias = "combustible")]
    fuel: Option<i64>,
    #[serde(alias = "estado")]
    state: Option<String>,
}

fn non_negative(value: i64, field: &str) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("{} must not be negative, got {}", field, value))
}

fn validate_runway(raw: RawRunway) -> Result<Runway, String> {
    let id = raw.id.trim();
    if id.is_empty() {
        return Err("runway id is empty".to_string());
    }
    let service_duration = non_negative(raw.service_duration, "service_duration")?;
    if service_duration == 0 {
        return Err(format!("runway {} has a zero service duration", id));
    }
    let enabled = raw.enabled.map(|f| f.as_bool()).transpose()?.unwrap_or(true);
    Ok(Runway::new(id, raw.category.trim(), service_duration, enabled))
}

fn validate_flight(raw: RawFlight) -> Result<Flight, String> {
    let id = raw.id.trim();
    if id.is_empty() {
        return Err("flight id is empty".to_string());
    }
    let priority = u8::try_from(raw.priority)
        .map_err(|_| format!("priority must be 0, 1 or 2, got {}", raw.priority))
        .and_then(Priority::try_from)?;

    if let Some(state) = raw.state.as_deref() {
        if !matches!(state.trim().to_uppercase().as_str(), "" | "PENDIENTE" | "PENDING") {
            info!(flight = id, state, "Loaded state ignored, flight starts pending");
        }
    }

    match raw.kind {
        FlightKind::Landing => {
            let eta = raw
                .eta
                .ok_or_else(|| format!("landing {} has no eta", id))
                .and_then(|eta| non_negative(eta, "eta"))?;
            let fuel = raw
                .fuel
                .map(|fuel| non_negative(fuel, "fuel"))
                .transpose()?
                .map(|fuel| u32::try_from(fuel).unwrap_or(u32::MAX));
            Ok(Flight::landing(id, eta, priority, fuel))
        }
        FlightKind::Departure => {
            if raw.fuel.is_some() {
                return Err(format!("departure {} must not carry fuel", id));
            }
            let etd = raw
                .etd
                .ok_or_else(|| format!("departure {} has no etd", id))
                .and_then(|etd| non_negative(etd, "etd"))?;
            Ok(Flight::departure(id, etd, priority))
        }
    }
}

fn decode<T, R>(
    section: &'static str,
    records: Vec<Value>,
    validate: impl Fn(R) -> Result<T, String>,
    id_of: impl Fn(&T) -> &str,
    warnings: &mut Vec<LoadError>,
) -> Vec<T>
where
    R: for<'de> Deserialize<'de>,
{
    let mut seen = HashSet::new();
    let mut accepted = vec![];
    for (index, value) in records.into_iter().enumerate() {
        let checked = serde_json::from_value::<R>(value)
            .map_err(|e| e.to_string())
            .and_then(&validate)
            .and_then(|record| {
                if seen.insert(id_of(&record).to_string()) {
                    Ok(record)
                } else {
                    Err(format!("duplicate id {}", id_of(&record)))
                }
            });
        match checked {
            Ok(record) => accepted.push(record),
            Err(reason) => {
                let err = LoadError::InvalidRecord {
                    section,
                    index,
                    reason,
                };
                warn!("{}", err);
                warnings.push(err);
            }
        }
    }
    accepted
}

impl Scenario {
    pub fn from_json_str(data: &str) -> Result<Scenario, LoadError> {
        let raw: RawScenario = serde_json::from_str(data)?;
        let mut warnings = vec![];

        let runways = decode::<Runway, RawRunway>(
            "runway",
            raw.runways,
            validate_runway,
            |r| r.id.as_ref(),
            &mut warnings,
        );
        let flights = decode::<Flight, RawFlight>(
            "flight",
            raw.flights,
            validate_flight,
            |f| f.id.as_ref(),
            &mut warnings,
        );

        info!(
            runways = runways.len(),
            flights = flights.len(),
            rejected = warnings.len(),
            "Scenario loaded"
        );
        Ok(Scenario {
            runways,
            flights,
            warnings,
        })
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Scenario, LoadError> {
        let data = std::fs::read_to_string(path)?;
        Scenario::from_json_str(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::Priority::{Emergency, Normal};
    use crate::time::Minute;

    fn reasons(scenario: &Scenario) -> Vec<String> {
        scenario.warnings.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_loads_spanish_headers() {
        let scenario = Scenario::from_json_str(
            r#"{
                "pistas": [
                    {"id_pista": "R1", "categoria": "larga", "tiempo_uso": 3, "habilitada": "1"},
                    {"id_pista": "R2", "categoria": "estandar", "tiempo_uso": 2, "habilitada": 0}
                ],
                "vuelos": [
                    {"id": "IB101", "tipo": "ATERRIZAJE", "eta": 0, "etd": null, "prioridad": 0, "combustible": 20, "estado": "PENDIENTE"},
                    {"id": "UX303", "tipo": "DESPEGUE", "eta": null, "etd": 4, "prioridad": 2, "combustible": null, "estado": "PENDIENTE"}
                ]
            }"#,
        )
        .unwrap();

        assert!(scenario.warnings.is_empty());
        assert_eq!(vec![Runway::new("R1", "larga", 3, true), Runway::new("R2", "estandar", 2, false)], scenario.runways);
        assert_eq!(Flight::landing("IB101", 0, Normal, Some(20)), scenario.flights[0]);
        assert_eq!(Minute(4), scenario.flights[1].scheduled_time);
        assert_eq!(Emergency, scenario.flights[1].priority);
        assert_eq!(None, scenario.flights[1].fuel);
    }

    #[test]
    fn test_bad_records_are_skipped_not_fatal() {
        let scenario = Scenario::from_json_str(
            r#"{
                "runways": [
                    {"id": "R1", "service_duration": 3, "enabled": true},
                    {"id": "R2", "service_duration": 0, "enabled": true},
                    {"id": "R3", "enabled": true},
                    {"id": "R1", "service_duration": 2}
                ],
                "flights": [
                    {"id": "OK1", "kind": "LANDING", "eta": 1, "priority": 1, "fuel": 9},
                    {"id": "NOETA", "kind": "ATERRIZAJE", "priority": 0, "fuel": 9},
                    {"id": "BADPRIO", "kind": "DESPEGUE", "etd": 1, "priority": 7},
                    {"id": "FUELDEP", "kind": "DESPEGUE", "etd": 1, "priority": 0, "fuel": 3},
                    {"id": "NEG", "kind": "ATERRIZAJE", "eta": -2, "priority": 0},
                    {"id": "BADKIND", "kind": "HOVER", "eta": 1, "priority": 0},
                    {"kind": "DESPEGUE", "etd": 1, "priority": 0},
                    {"id": "OK1", "kind": "DESPEGUE", "etd": 2, "priority": 0},
                    {"id": "OK2", "kind": "DESPEGUE", "etd": 2, "priority": 0, "state": "ASIGNADO"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(vec![Runway::new("R1", "", 3, true)], scenario.runways);
        let ids = scenario.flights.iter().map(|f| f.id.to_string()).collect::<Vec<_>>();
        assert_eq!(vec!["OK1", "OK2"], ids);

        let reasons = reasons(&scenario);
        assert_eq!(3 + 7, reasons.len());
        assert!(reasons[0].starts_with("invalid runway record #1"));
        assert!(reasons.iter().any(|r| r.contains("duplicate id R1")));
        assert!(reasons.iter().any(|r| r.contains("landing NOETA has no eta")));
        assert!(reasons.iter().any(|r| r.contains("priority must be 0, 1 or 2")));
        assert!(reasons.iter().any(|r| r.contains("departure FUELDEP must not carry fuel")));
        assert!(reasons.iter().any(|r| r.contains("eta must not be negative")));
        assert!(reasons.iter().any(|r| r.contains("duplicate id OK1")));
        assert!(scenario.warnings.iter().all(|w| matches!(w, LoadError::InvalidRecord { .. })));
    }

    #[test]
    fn test_missing_arrays_is_an_empty_scenario() {
        let scenario = Scenario::from_json_str("{}").unwrap();
        assert!(scenario.runways.is_empty());
        assert!(scenario.flights.is_empty());
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        assert!(matches!(Scenario::from_json_str("[1, 2"), Err(LoadError::Json(_))));
        assert!(matches!(
            Scenario::load_from_file("/nonexistent/runway-sim.json"),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn test_default_scenario_loads_cleanly() {
        let scenario = Scenario::load_from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/data/default.json")).unwrap();
        assert!(scenario.warnings.is_empty());
        assert!(!scenario.runways.is_empty());
        assert!(!scenario.flights.is_empty());
    }
}
