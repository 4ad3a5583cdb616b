//! Flight-state lookup against the OpenSky Network.
//!
//! OpenSky reports each aircraft as a positional JSON array. That array is
//! decoded once, at the boundary, into a named [`StateVector`]; nothing else
//! in the crate indexes into provider arrays. Only the fields the tracker
//! reads are decoded, so a type change elsewhere in the array is ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fleet::{Fleet, Icao24};
use crate::http::{check_status, join_url, HttpClient};
use crate::position::Position;

const SERVICE: &str = "OpenSky";

/// Field positions inside an OpenSky state vector.
mod field {
    pub const ICAO24: usize = 0;
    pub const CALLSIGN: usize = 1;
    pub const ORIGIN_COUNTRY: usize = 2;
    pub const LAST_CONTACT: usize = 4;
    pub const LONGITUDE: usize = 5;
    pub const LATITUDE: usize = 6;
    pub const BARO_ALTITUDE: usize = 7;
    pub const ON_GROUND: usize = 8;
    pub const VELOCITY: usize = 9;
    pub const GEO_ALTITUDE: usize = 13;
}

/// The body of `GET /states/all`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatesResponse {
    /// Server time the states refer to, in Unix seconds.
    #[serde(default)]
    pub time: Option<i64>,
    /// `null` when none of the requested aircraft is being tracked.
    #[serde(default)]
    pub states: Option<Vec<StateVector>>,
}

/// One aircraft's state as reported by OpenSky.
///
/// Every field is optional: the provider sends `null` freely and older
/// responses omit trailing fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateVector {
    /// Transponder address.
    pub icao24: Option<String>,
    /// Callsign, space padded by the provider.
    pub callsign: Option<String>,
    /// Country inferred from the transponder address.
    pub origin_country: Option<String>,
    /// Unix seconds of the last message of any kind.
    pub last_contact: Option<i64>,
    /// Degrees east.
    pub longitude: Option<f64>,
    /// Degrees north.
    pub latitude: Option<f64>,
    /// Barometric altitude in metres.
    pub baro_altitude: Option<f64>,
    /// Whether the aircraft reports being on the ground.
    pub on_ground: Option<bool>,
    /// Ground speed in m/s.
    pub velocity: Option<f64>,
    /// Geometric altitude in metres.
    pub geo_altitude: Option<f64>,
}

impl<'de> Deserialize<'de> for StateVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Vec::<Value>::deserialize(deserializer)?;
        Self::from_fields(&fields).map_err(serde::de::Error::custom)
    }
}

impl StateVector {
    fn from_fields(fields: &[Value]) -> std::result::Result<Self, String> {
        Ok(Self {
            icao24: string_at(fields, field::ICAO24, "icao24")?,
            callsign: string_at(fields, field::CALLSIGN, "callsign")?,
            origin_country: string_at(fields, field::ORIGIN_COUNTRY, "origin_country")?,
            last_contact: int_at(fields, field::LAST_CONTACT, "last_contact")?,
            longitude: float_at(fields, field::LONGITUDE, "longitude")?,
            latitude: float_at(fields, field::LATITUDE, "latitude")?,
            baro_altitude: float_at(fields, field::BARO_ALTITUDE, "baro_altitude")?,
            on_ground: bool_at(fields, field::ON_GROUND, "on_ground")?,
            velocity: float_at(fields, field::VELOCITY, "velocity")?,
            geo_altitude: float_at(fields, field::GEO_ALTITUDE, "geo_altitude")?,
        })
    }

    /// The reported position, if both coordinates are present.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        }
    }

    /// Whether this state describes an aircraft in the air with a known position.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        self.on_ground != Some(true) && self.position().is_some()
    }
}

fn present(fields: &[Value], index: usize) -> Option<&Value> {
    fields.get(index).filter(|v| !v.is_null())
}

fn mismatch(name: &str, index: usize, expected: &str, got: &Value) -> String {
    format!("state field {name} (index {index}): expected {expected}, got {got}")
}

fn string_at(
    fields: &[Value],
    index: usize,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    present(fields, index)
        .map(|v| {
            v.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| mismatch(name, index, "string", v))
        })
        .transpose()
}

fn float_at(fields: &[Value], index: usize, name: &str) -> std::result::Result<Option<f64>, String> {
    present(fields, index)
        .map(|v| v.as_f64().ok_or_else(|| mismatch(name, index, "number", v)))
        .transpose()
}

fn int_at(fields: &[Value], index: usize, name: &str) -> std::result::Result<Option<i64>, String> {
    present(fields, index)
        .map(|v| v.as_i64().ok_or_else(|| mismatch(name, index, "integer", v)))
        .transpose()
}

fn bool_at(fields: &[Value], index: usize, name: &str) -> std::result::Result<Option<bool>, String> {
    present(fields, index)
        .map(|v| v.as_bool().ok_or_else(|| mismatch(name, index, "boolean", v)))
        .transpose()
}

/// The airborne aircraft selected for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightState {
    /// Transponder address, if the provider sent one.
    pub icao24: Option<String>,
    /// Trimmed callsign, falling back to the upper-cased transponder address.
    pub callsign: String,
    /// Country of registration.
    pub nationality: Option<String>,
    /// Altitude in metres, geometric preferred over barometric.
    pub altitude: Option<f64>,
    /// Ground speed in m/s.
    pub velocity: Option<f64>,
    /// Current position.
    pub position: Position,
    /// When the provider last heard from the aircraft.
    pub last_contact: Option<DateTime<Utc>>,
}

impl FlightState {
    /// Build a flight state from a provider record.
    ///
    /// Returns `None` if the record carries no position.
    #[must_use]
    pub fn from_state_vector(state: &StateVector) -> Option<Self> {
        let position = state.position()?;
        let callsign = state
            .callsign
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(ToString::to_string)
            .or_else(|| state.icao24.as_ref().map(|id| id.to_ascii_uppercase()))
            .unwrap_or_else(|| "UNKNOWN".to_string());

        Some(Self {
            icao24: state.icao24.clone(),
            callsign,
            nationality: state.origin_country.clone(),
            altitude: state.geo_altitude.or(state.baro_altitude),
            velocity: state.velocity,
            position,
            last_contact: state
                .last_contact
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

/// Source of live flight states.
#[async_trait]
pub trait FlightStateProvider: Send + Sync {
    /// Fetch the current states for the given aircraft.
    ///
    /// An empty vector means none of them is being tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or answers badly.
    async fn states(&self, identifiers: &[Icao24]) -> Result<Vec<StateVector>>;
}

/// OpenSky REST client.
#[derive(Debug, Clone)]
pub struct OpenSkyClient {
    http: HttpClient,
    base_url: String,
}

impl OpenSkyClient {
    /// Create a client against the given API base URL.
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Query parameters selecting the given aircraft, one `icao24` pair each.
    #[must_use]
    pub fn query(identifiers: &[Icao24]) -> Vec<(&'static str, &str)> {
        identifiers.iter().map(|id| ("icao24", id.as_str())).collect()
    }
}

#[async_trait]
impl FlightStateProvider for OpenSkyClient {
    async fn states(&self, identifiers: &[Icao24]) -> Result<Vec<StateVector>> {
        let url = join_url(&self.base_url, "states/all");
        debug!(%url, count = identifiers.len(), "querying flight states");

        let response = self
            .http
            .inner()
            .get(&url)
            .query(&Self::query(identifiers))
            .send()
            .await?;
        let body = check_status(SERVICE, response).await?.text().await?;
        let parsed: StatesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::unexpected(SERVICE, e.to_string()))?;

        Ok(parsed.states.unwrap_or_default())
    }
}

/// Pick the flight to report from a provider response.
///
/// The first airborne fleet member in provider order wins. Returns the flight
/// together with the number of other airborne members that were passed over.
#[must_use]
pub fn select_flight(fleet: &Fleet, states: &[StateVector]) -> Option<(FlightState, usize)> {
    let mut airborne = states
        .iter()
        .filter(|s| s.icao24.as_deref().map_or(true, |id| fleet.contains(id)))
        .filter(|s| s.is_airborne());

    let first = airborne.next()?;
    let flight = FlightState::from_state_vector(first)?;
    Some((flight, airborne.count()))
}

/// Determine whether any member of the fleet is currently airborne.
///
/// # Errors
///
/// Returns an error if the provider query fails. "Not flying" is `Ok(None)`.
pub async fn locate(
    provider: &dyn FlightStateProvider,
    fleet: &Fleet,
) -> Result<Option<FlightState>> {
    let states = provider.states(fleet.members()).await?;
    debug!(received = states.len(), "flight states received");

    let Some((flight, passed_over)) = select_flight(fleet, &states) else {
        info!(fleet = fleet.name(), "aircraft is not currently tracked");
        return Ok(None);
    };

    if passed_over > 0 {
        warn!(
            passed_over,
            reported = %flight.callsign,
            "more than one tracked aircraft is airborne; only the first is reported"
        );
    }

    info!(
        callsign = %flight.callsign,
        nationality = flight.nationality.as_deref().unwrap_or("unknown"),
        position = %flight.position,
        altitude = ?flight.altitude,
        velocity = ?flight.velocity,
        last_contact = ?flight.last_contact,
        "tracked aircraft is airborne"
    );
    Ok(Some(flight))
}
