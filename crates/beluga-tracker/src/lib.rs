//! `beluga-tracker` - announces when tracked aircraft are airborne
//!
//! One invocation queries a flight-state provider for a fixed fleet, and if an
//! aircraft is flying, reverse-geocodes its position, renders a static map and
//! publishes a geotagged post with both.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod fleet;
pub mod geocode;
pub mod http;
pub mod logging;
pub mod map;
pub mod opensky;
pub mod position;
pub mod publish;
pub mod tracker;

pub use config::Config;
pub use error::{Error, Result};
pub use fleet::{Fleet, Icao24};
pub use logging::init_logging;
pub use position::Position;
pub use tracker::{Invocation, Outcome, Tracker};
