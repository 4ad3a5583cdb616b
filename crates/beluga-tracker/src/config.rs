//! Configuration management for beluga-tracker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fleet::{self, Fleet, Icao24};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "beluga-tracker";

/// Default map image file name inside the temp directory.
const MAP_FILE_NAME: &str = "map.png";

/// Prefix for environment overrides of regular settings.
const ENV_PREFIX: &str = "BELUGA_TRACKER_";

/// Environment variable holding the static-map API key.
pub const MAPS_API_KEY_VAR: &str = "Google_Maps_API_Key";
/// Environment variable holding the Twitter consumer key.
pub const TWITTER_API_KEY_VAR: &str = "Twitter_API_Key";
/// Environment variable holding the Twitter consumer secret.
pub const TWITTER_API_KEY_SECRET_VAR: &str = "Twitter_API_Key_Secret";
/// Environment variable holding the Twitter access token.
pub const TWITTER_ACCESS_TOKEN_VAR: &str = "Twitter_Access_Token";
/// Environment variable holding the Twitter access token secret.
pub const TWITTER_ACCESS_TOKEN_SECRET_VAR: &str = "Twitter_Secret_Access_Token";

const CREDENTIAL_VARS: [&str; 5] = [
    MAPS_API_KEY_VAR,
    TWITTER_API_KEY_VAR,
    TWITTER_API_KEY_SECRET_VAR,
    TWITTER_ACCESS_TOKEN_VAR,
    TWITTER_ACCESS_TOKEN_SECRET_VAR,
];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Credential environment variables (`Google_Maps_API_Key`, `Twitter_*`)
/// 2. Environment variables prefixed with `BELUGA_TRACKER_` (nested with `__`)
/// 3. TOML config file at `~/.config/beluga-tracker/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which aircraft are tracked and how they are named.
    pub fleet: FleetConfig,
    /// Remote service base URLs.
    pub endpoints: EndpointsConfig,
    /// Static map rendering options.
    pub map: MapConfig,
    /// HTTP client options.
    pub http: HttpConfig,
    /// Secrets. Never serialized.
    #[serde(skip_serializing)]
    pub credentials: Credentials,
}

/// Fleet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Display name used in status messages.
    pub name: String,
    /// Transponder identifiers (24-bit ICAO addresses, hex).
    pub icao24: Vec<String>,
    /// Text appended to the end of every status message.
    pub hashtags: String,
}

/// Remote service endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// OpenSky REST API base URL.
    pub opensky: String,
    /// Nominatim base URL.
    pub nominatim: String,
    /// Google Static Maps endpoint.
    pub static_map: String,
    /// Twitter REST API base URL.
    pub twitter_api: String,
    /// Twitter media upload base URL.
    pub twitter_upload: String,
}

/// Static map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Zoom level, 0 (world) to 21 (building).
    pub zoom: u8,
    /// Image width in pixels.
    pub width: u16,
    /// Image height in pixels.
    pub height: u16,
    /// Region bias passed to the renderer.
    pub region: String,
    /// Marker colour.
    pub marker_color: String,
    /// Where the rendered image is written.
    /// Defaults to `<temp dir>/map.png`
    pub output_path: Option<PathBuf>,
}

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    /// Set to 0 to use the client default (no timeout).
    pub timeout_secs: u64,
}

/// Credentials read from the environment.
///
/// Nothing is checked at load time; each accessor fails with
/// [`Error::MissingCredential`] when the stage that needs it runs.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Static map API key.
    pub google_maps_api_key: Option<String>,
    /// Twitter consumer key.
    pub twitter_api_key: Option<String>,
    /// Twitter consumer secret.
    pub twitter_api_key_secret: Option<String>,
    /// Twitter access token.
    pub twitter_access_token: Option<String>,
    /// Twitter access token secret.
    pub twitter_secret_access_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: Option<&String>) -> &'static str {
            if value.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Credentials")
            .field("google_maps_api_key", &redact(self.google_maps_api_key.as_ref()))
            .field("twitter_api_key", &redact(self.twitter_api_key.as_ref()))
            .field(
                "twitter_api_key_secret",
                &redact(self.twitter_api_key_secret.as_ref()),
            )
            .field(
                "twitter_access_token",
                &redact(self.twitter_access_token.as_ref()),
            )
            .field(
                "twitter_secret_access_token",
                &redact(self.twitter_secret_access_token.as_ref()),
            )
            .finish()
    }
}

/// The four OAuth 1.0a values needed to post as a user.
#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    /// Consumer (API) key.
    pub consumer_key: String,
    /// Consumer (API) secret.
    pub consumer_secret: String,
    /// User access token.
    pub access_token: String,
    /// User access token secret.
    pub access_token_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            name: "BelugaXL".to_string(),
            icao24: fleet::beluga_xl_identifiers(),
            hashtags: "#Beluga @Airbus".to_string(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            opensky: "https://opensky-network.org/api".to_string(),
            nominatim: "https://nominatim.openstreetmap.org".to_string(),
            static_map: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
            twitter_api: "https://api.twitter.com/1.1".to_string(),
            twitter_upload: "https://upload.twitter.com/1.1".to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 6,
            width: 500,
            height: 300,
            region: "ie".to_string(),
            marker_color: "red".to_string(),
            output_path: None, // Resolved to the temp dir at runtime
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("beluga-tracker/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 0,
        }
    }
}

impl HttpConfig {
    /// The per-request timeout, `None` when `timeout_secs` is 0.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Credentials {
    /// The static map API key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if `Google_Maps_API_Key` is unset.
    pub fn maps_api_key(&self) -> Result<&str> {
        require(self.google_maps_api_key.as_deref(), MAPS_API_KEY_VAR)
    }

    /// The OAuth values for posting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] naming the first unset variable.
    pub fn twitter(&self) -> Result<TwitterCredentials> {
        Ok(TwitterCredentials {
            consumer_key: require(self.twitter_api_key.as_deref(), TWITTER_API_KEY_VAR)?
                .to_string(),
            consumer_secret: require(
                self.twitter_api_key_secret.as_deref(),
                TWITTER_API_KEY_SECRET_VAR,
            )?
            .to_string(),
            access_token: require(
                self.twitter_access_token.as_deref(),
                TWITTER_ACCESS_TOKEN_VAR,
            )?
            .to_string(),
            access_token_secret: require(
                self.twitter_secret_access_token.as_deref(),
                TWITTER_ACCESS_TOKEN_SECRET_VAR,
            )?
            .to_string(),
        })
    }
}

fn require<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingCredential { name }),
    }
}

impl Config {
    /// Load configuration, reading the TOML layer from `config_path` or the
    /// default location.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment without extracting it.
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&CREDENTIAL_VARS)
                    .map(|key| format!("credentials.{}", key.as_str().to_ascii_lowercase()).into()),
            )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// Credentials are deliberately not checked here.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.fleet()?;

        if self.map.zoom > 21 {
            return Err(Error::ConfigValidation {
                message: format!("map zoom ({}) must be between 0 and 21", self.map.zoom),
            });
        }

        for (name, value) in [("width", self.map.width), ("height", self.map.height)] {
            if value == 0 || value > 640 {
                return Err(Error::ConfigValidation {
                    message: format!("map {name} ({value}) must be between 1 and 640"),
                });
            }
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "http user_agent must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Build the tracked fleet from the configured identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if an identifier is malformed or the list is empty.
    pub fn fleet(&self) -> Result<Fleet> {
        let ids = self
            .fleet
            .icao24
            .iter()
            .map(|s| Icao24::parse(s))
            .collect::<Result<Vec<_>>>()?;
        Fleet::new(&self.fleet.name, &self.fleet.hashtags, ids)
    }

    /// Get the map output path, resolving defaults if not set.
    #[must_use]
    pub fn map_output_path(&self) -> PathBuf {
        self.map
            .output_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(MAP_FILE_NAME))
    }
}
