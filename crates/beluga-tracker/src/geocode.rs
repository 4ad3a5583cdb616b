//! Reverse geocoding of aircraft positions.
//!
//! An address that cannot be found is an expected outcome: the location
//! falls back to the raw coordinates. Transport failures still propagate.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::http::{check_status, join_url, HttpClient};
use crate::position::Position;

const SERVICE: &str = "Nominatim";

/// Converts coordinates into a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Look up the address at `position`.
    ///
    /// `Ok(None)` means the service has no address for this point.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached.
    async fn reverse(&self, position: Position) -> Result<Option<String>>;
}

/// The location shown in the status message.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLocation {
    /// An address returned by the geocoder.
    Address(String),
    /// No address was found; the coordinates are shown instead.
    Coordinates(Position),
}

impl ResolvedLocation {
    /// Check if the geocoder produced an address.
    #[must_use]
    pub fn is_address(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => f.write_str(address),
            Self::Coordinates(position) => f.write_str(&position.fallback_label()),
        }
    }
}

/// Resolve `position` to a display location, never failing on "not found".
///
/// # Errors
///
/// Returns an error only if the geocoder itself fails.
pub async fn resolve_location(
    geocoder: &dyn ReverseGeocoder,
    position: Position,
) -> Result<ResolvedLocation> {
    match geocoder.reverse(position).await? {
        Some(address) => {
            info!(%address, "position resolved");
            Ok(ResolvedLocation::Address(address))
        }
        None => {
            warn!(%position, "no address found, using coordinates");
            Ok(ResolvedLocation::Coordinates(position))
        }
    }
}

/// Body of a Nominatim `/reverse` response.
///
/// Unresolvable points come back as `{"error": "Unable to geocode"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseResponse {
    /// Full formatted address.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Reason the lookup failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl ReverseResponse {
    /// The address, if the lookup produced a non-empty one.
    #[must_use]
    pub fn into_address(self) -> Option<String> {
        if let Some(reason) = &self.error {
            debug!(%reason, "geocoder reported no result");
            return None;
        }
        self.display_name.filter(|name| !name.trim().is_empty())
    }
}

/// Nominatim (OpenStreetMap) reverse geocoder.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: HttpClient,
    base_url: String,
}

impl NominatimClient {
    /// Create a client against the given Nominatim base URL.
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Query parameters for a reverse lookup.
    #[must_use]
    pub fn query(position: Position) -> Vec<(&'static str, String)> {
        vec![
            ("format", "jsonv2".to_string()),
            ("lat", position.latitude.to_string()),
            ("lon", position.longitude.to_string()),
        ]
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, position: Position) -> Result<Option<String>> {
        let url = join_url(&self.base_url, "reverse");
        debug!(%url, %position, "reverse geocoding");

        let response = self
            .http
            .inner()
            .get(&url)
            .query(&Self::query(position))
            .send()
            .await?;
        let body = check_status(SERVICE, response).await?.text().await?;
        let parsed: ReverseResponse = serde_json::from_str(&body)
            .map_err(|e| Error::unexpected(SERVICE, e.to_string()))?;

        Ok(parsed.into_address())
    }
}
