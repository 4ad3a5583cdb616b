//! Composition of the status message.

use std::fmt;

use crate::fleet::Fleet;
use crate::geocode::ResolvedLocation;
use crate::opensky::FlightState;

/// The text published for one sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage(String);

impl StatusMessage {
    /// Compose the message for `flight` at `location`.
    #[must_use]
    pub fn compose(fleet: &Fleet, flight: &FlightState, location: &ResolvedLocation) -> Self {
        let mut text = format!(
            "{} {} is on the move!\n\nCurrent position: {location}.\n\nCruising at {} with an airspeed of {}",
            fleet.name(),
            flight.callsign,
            altitude_label(flight.altitude),
            velocity_label(flight.velocity),
        );
        if !fleet.hashtags().is_empty() {
            text.push_str("\n ");
            text.push_str(fleet.hashtags());
        }
        Self(text)
    }

    /// The message text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Altitude rounded to whole metres with thousands separators, e.g. `10,000m`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn altitude_label(altitude: Option<f64>) -> String {
    match altitude {
        Some(metres) if metres.is_finite() => format!("{}m", group_thousands(metres.round() as i64)),
        _ => "an unknown altitude".to_string(),
    }
}

/// Ground speed in its shortest form, e.g. `230m/s` or `214.5m/s`.
#[must_use]
pub fn velocity_label(velocity: Option<f64>) -> String {
    match velocity {
        Some(speed) if speed.is_finite() => format!("{speed}m/s"),
        _ => "an unknown speed".to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Icao24;
    use crate::position::Position;

    fn fleet(hashtags: &str) -> Fleet {
        Fleet::new("BelugaXL", hashtags, [Icao24::parse("395d66").unwrap()]).unwrap()
    }

    fn flight() -> FlightState {
        FlightState {
            icao24: None,
            callsign: "GBWYB".to_string(),
            nationality: Some("Germany".to_string()),
            altitude: Some(10000.0),
            velocity: Some(230.0),
            position: Position::new(53.2, 8.5),
            last_contact: None,
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(10000), "10,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-4500), "-4,500");
    }

    #[test]
    fn test_altitude_label() {
        assert_eq!(altitude_label(Some(10000.0)), "10,000m");
        assert_eq!(altitude_label(Some(10363.68)), "10,364m");
        assert_eq!(altitude_label(None), "an unknown altitude");
        assert_eq!(altitude_label(Some(f64::NAN)), "an unknown altitude");
    }

    #[test]
    fn test_velocity_label() {
        assert_eq!(velocity_label(Some(230.0)), "230m/s");
        assert_eq!(velocity_label(Some(214.5)), "214.5m/s");
        assert_eq!(velocity_label(None), "an unknown speed");
    }

    #[test]
    fn test_compose_with_address() {
        let location = ResolvedLocation::Address("Bremen, Germany".to_string());
        let status = StatusMessage::compose(&fleet("#Beluga @Airbus"), &flight(), &location);

        assert_eq!(
            status.as_str(),
            "BelugaXL GBWYB is on the move!\n\n\
             Current position: Bremen, Germany.\n\n\
             Cruising at 10,000m with an airspeed of 230m/s\n #Beluga @Airbus"
        );
    }

    #[test]
    fn test_compose_with_fallback_location() {
        let location = ResolvedLocation::Coordinates(Position::new(53.2, 8.5));
        let status = StatusMessage::compose(&fleet("#Beluga"), &flight(), &location);
        let text = status.to_string();

        assert!(text.contains("GBWYB"));
        assert!(text.contains("10,000m"));
        assert!(text.contains("230m/s"));
        assert!(text.contains("Current position: Latitude: 53.2, Longitude: 8.5."));
    }

    #[test]
    fn test_compose_without_hashtags() {
        let location = ResolvedLocation::Address("Somewhere".to_string());
        let status = StatusMessage::compose(&fleet(""), &flight(), &location);
        assert!(status.as_str().ends_with("230m/s"));
    }
}
