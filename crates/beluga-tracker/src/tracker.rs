//! One tracking invocation: locate, resolve, render, publish.
//!
//! The stages run strictly in sequence and each consumes the previous
//! stage's output. If no tracked aircraft is airborne the invocation ends
//! successfully after the first stage.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::fleet::Fleet;
use crate::geocode::{resolve_location, NominatimClient, ResolvedLocation, ReverseGeocoder};
use crate::http::HttpClient;
use crate::map::{render_to_file, MapImage, MapRenderer, MapStyle, StaticMapClient};
use crate::opensky::{locate, FlightState, FlightStateProvider, OpenSkyClient};
use crate::publish::{publish, Post, PublishReceipt, Publisher, StatusMessage, TwitterClient};

/// Metadata about the current invocation, logged but otherwise unused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationContext {
    /// Random id correlating the log lines of one run.
    pub invocation_id: String,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// Version of this program.
    pub version: &'static str,
}

impl InvocationContext {
    /// A context for an invocation starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            invocation_id: format!("{:016x}", rand::random::<u64>()),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The trigger of a run: an opaque scheduler event plus context.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Whatever the scheduler sent.
    pub event: Value,
    /// Run metadata.
    pub context: InvocationContext,
}

impl Invocation {
    /// Wrap a scheduler event with a fresh context.
    #[must_use]
    pub fn new(event: Value) -> Self {
        Self {
            event,
            context: InvocationContext::new(),
        }
    }
}

/// What a flying aircraft produced before publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    /// The reported aircraft.
    pub flight: FlightState,
    /// Where it is.
    pub location: ResolvedLocation,
    /// The composed text.
    pub status: StatusMessage,
    /// The rendered map.
    pub map: MapImage,
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No tracked aircraft is airborne; nothing else was called.
    NotFlying,
    /// Everything ran except publishing.
    DryRun(Sighting),
    /// The sighting was published.
    Published(Sighting, PublishReceipt),
}

impl Outcome {
    /// Check if a post was published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(..))
    }
}

/// The pipeline with its four stages wired in.
pub struct Tracker {
    fleet: Fleet,
    locator: Box<dyn FlightStateProvider>,
    geocoder: Box<dyn ReverseGeocoder>,
    renderer: Box<dyn MapRenderer>,
    publisher: Box<dyn Publisher>,
    map_path: PathBuf,
    dry_run: bool,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("fleet", &self.fleet)
            .field("map_path", &self.map_path)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Assemble a tracker from explicit stages.
    #[must_use]
    pub fn new(
        fleet: Fleet,
        locator: Box<dyn FlightStateProvider>,
        geocoder: Box<dyn ReverseGeocoder>,
        renderer: Box<dyn MapRenderer>,
        publisher: Box<dyn Publisher>,
        map_path: PathBuf,
    ) -> Self {
        Self {
            fleet,
            locator,
            geocoder,
            renderer,
            publisher,
            map_path,
            dry_run: false,
        }
    }

    /// Assemble the production tracker from configuration.
    ///
    /// Credentials are carried along but not checked until needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let endpoints = &config.endpoints;

        Ok(Self::new(
            config.fleet()?,
            Box::new(OpenSkyClient::new(http.clone(), &endpoints.opensky)),
            Box::new(NominatimClient::new(http.clone(), &endpoints.nominatim)),
            Box::new(StaticMapClient::new(
                http.clone(),
                &endpoints.static_map,
                MapStyle::from(&config.map),
                config.credentials.clone(),
            )),
            Box::new(TwitterClient::new(
                http,
                &endpoints.twitter_api,
                &endpoints.twitter_upload,
                config.credentials.clone(),
            )),
            config.map_output_path(),
        ))
    }

    /// Skip the publish stage and report the sighting instead.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The fleet being tracked.
    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Run one invocation.
    ///
    /// # Errors
    ///
    /// Any stage failure ends the invocation with that error. Not flying is
    /// [`Outcome::NotFlying`], not an error.
    pub async fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        let context = &invocation.context;
        info!(
            invocation_id = %context.invocation_id,
            event = %invocation.event,
            "invocation started"
        );

        let Some(flight) = locate(self.locator.as_ref(), &self.fleet).await? else {
            info!(invocation_id = %context.invocation_id, "nothing to report");
            return Ok(Outcome::NotFlying);
        };

        let location = resolve_location(self.geocoder.as_ref(), flight.position).await?;
        let status = StatusMessage::compose(&self.fleet, &flight, &location);
        let map = render_to_file(self.renderer.as_ref(), flight.position, &self.map_path).await?;

        let sighting = Sighting {
            flight,
            location,
            status,
            map,
        };

        if self.dry_run {
            info!(content = %sighting.status, "dry run, not publishing");
            return Ok(Outcome::DryRun(sighting));
        }

        let post = Post {
            text: sighting.status.to_string(),
            media_path: sighting.map.path.clone(),
            position: sighting.flight.position,
        };
        let receipt = publish(self.publisher.as_ref(), &post).await?;

        info!(
            event = %invocation.event,
            context = ?context,
            "invocation finished"
        );
        Ok(Outcome::Published(sighting, receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fleet::Icao24;
    use crate::opensky::{StateVector, StatesResponse};
    use crate::position::Position;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Calls {
        geocode: AtomicUsize,
        render: AtomicUsize,
        publish: AtomicUsize,
        posts: Mutex<Vec<Post>>,
    }

    struct FakeLocator(Vec<StateVector>);

    #[async_trait]
    impl FlightStateProvider for FakeLocator {
        async fn states(&self, _identifiers: &[Icao24]) -> Result<Vec<StateVector>> {
            Ok(self.0.clone())
        }
    }

    struct FakeGeocoder(Arc<Calls>, Option<&'static str>);

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        async fn reverse(&self, _position: Position) -> Result<Option<String>> {
            self.0.geocode.fetch_add(1, Ordering::SeqCst);
            Ok(self.1.map(ToString::to_string))
        }
    }

    struct FakeRenderer(Arc<Calls>, bool);

    #[async_trait]
    impl MapRenderer for FakeRenderer {
        async fn render(&self, _position: Position) -> Result<Vec<u8>> {
            self.0.render.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                Ok(b"\x89PNG".to_vec())
            } else {
                Err(Error::api("Google Static Maps", 403, "invalid key"))
            }
        }
    }

    struct FakePublisher(Arc<Calls>);

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, post: &Post) -> Result<PublishReceipt> {
            self.0.publish.fetch_add(1, Ordering::SeqCst);
            self.0.posts.lock().unwrap().push(post.clone());
            Ok(PublishReceipt {
                id: "1".to_string(),
                text: Some(post.text.clone()),
                raw: serde_json::json!({"id_str": "1"}),
            })
        }
    }

    fn fleet() -> Fleet {
        let ids = ["395d66", "395d67", "395d68", "395d69"]
            .iter()
            .map(|s| Icao24::parse(s).unwrap());
        Fleet::new("BelugaXL", "#Beluga @Airbus", ids).unwrap()
    }

    fn states(body: &str) -> Vec<StateVector> {
        let response: StatesResponse = serde_json::from_str(body).unwrap();
        response.states.unwrap_or_default()
    }

    fn map_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "beluga_tracker_{name}_{}.png",
            std::process::id()
        ))
    }

    fn tracker(
        calls: &Arc<Calls>,
        states: Vec<StateVector>,
        address: Option<&'static str>,
        render_ok: bool,
        path: PathBuf,
    ) -> Tracker {
        Tracker::new(
            fleet(),
            Box::new(FakeLocator(states)),
            Box::new(FakeGeocoder(Arc::clone(calls), address)),
            Box::new(FakeRenderer(Arc::clone(calls), render_ok)),
            Box::new(FakePublisher(Arc::clone(calls))),
            path,
        )
    }

    const ONE_STATE: &str = r#"{"time": 1700000000, "states": [
        [null, "GBWYB", "Germany", null, null, 8.5, 53.2, null, null, 230, null, null, null, 10000]
    ]}"#;

    #[tokio::test]
    async fn test_not_flying_calls_nothing_else() {
        let calls = Arc::new(Calls::default());
        let tracker = tracker(
            &calls,
            states(r#"{"time": 1700000000, "states": null}"#),
            Some("unused"),
            true,
            map_path("not_flying"),
        );

        let outcome = tracker.run(&Invocation::new(Value::Null)).await.unwrap();

        assert_eq!(outcome, Outcome::NotFlying);
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 0);
        assert_eq!(calls.render.load(Ordering::SeqCst), 0);
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_with_fallback_location() {
        let calls = Arc::new(Calls::default());
        let path = map_path("e2e");
        let tracker = tracker(&calls, states(ONE_STATE), None, true, path.clone());

        let outcome = tracker
            .run(&Invocation::new(serde_json::json!({"source": "scheduler"})))
            .await
            .unwrap();

        let Outcome::Published(sighting, receipt) = outcome else {
            panic!("expected a published outcome");
        };
        let text = sighting.status.as_str();
        assert!(text.contains("GBWYB"));
        assert!(text.contains("10,000m"));
        assert!(text.contains("230m/s"));
        assert!(text.contains("Latitude: 53.2, Longitude: 8.5"));
        assert_eq!(receipt.id, "1");

        assert_eq!(calls.geocode.load(Ordering::SeqCst), 1);
        assert_eq!(calls.render.load(Ordering::SeqCst), 1);
        assert_eq!(calls.publish.load(Ordering::SeqCst), 1);

        let posts = calls.posts.lock().unwrap();
        assert_eq!(posts[0].text, text);
        assert_eq!(posts[0].media_path, path);
        assert_eq!(posts[0].position, Position::new(53.2, 8.5));
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_end_to_end_with_address() {
        let calls = Arc::new(Calls::default());
        let path = map_path("address");
        let tracker = tracker(
            &calls,
            states(ONE_STATE),
            Some("Bremen, Germany"),
            true,
            path.clone(),
        );

        let outcome = tracker.run(&Invocation::new(Value::Null)).await.unwrap();

        assert!(outcome.is_published());
        let posts = calls.posts.lock().unwrap();
        assert!(posts[0].text.contains("Current position: Bremen, Germany."));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_render_failure_is_fatal_and_skips_publish() {
        let calls = Arc::new(Calls::default());
        let tracker = tracker(
            &calls,
            states(ONE_STATE),
            None,
            false,
            map_path("render_fail"),
        );

        let result = tracker.run(&Invocation::new(Value::Null)).await;

        assert!(matches!(result, Err(Error::Api { status: 403, .. })));
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_publish() {
        let calls = Arc::new(Calls::default());
        let path = map_path("dry_run");
        let tracker =
            tracker(&calls, states(ONE_STATE), None, true, path.clone()).with_dry_run(true);

        let outcome = tracker.run(&Invocation::new(Value::Null)).await.unwrap();

        assert!(matches!(outcome, Outcome::DryRun(_)));
        assert!(!outcome.is_published());
        assert_eq!(calls.render.load(Ordering::SeqCst), 1);
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_config_defaults() {
        let tracker = Tracker::from_config(&Config::default()).unwrap();
        assert_eq!(tracker.fleet().members().len(), 4);
        let debug_str = format!("{tracker:?}");
        assert!(debug_str.contains("Tracker"));
        assert!(debug_str.contains("map_path"));
    }

    #[test]
    fn test_invocation_context_ids_differ() {
        let a = InvocationContext::new();
        let b = InvocationContext::new();
        assert_eq!(a.invocation_id.len(), 16);
        assert_ne!(a.invocation_id, b.invocation_id);
    }
}
