//! Human-readable location labels for beacons.
//!
//! Each beacon's minor (sub identifier) maps to the place it is installed.
//! This lookup is only used when presenting snapshots; the registry does not
//! know about locations.

use std::collections::BTreeMap;

/// Label shown when a beacon's minor has no configured location.
pub const UNKNOWN_LOCATION: &str = "unknown location";

/// Label shown when no beacon is in range.
pub const NO_BEACONS: &str = "no beacons";

/// A type alias for minor-to-label mappings.
pub type LocationMap = BTreeMap<u16, String>;

/// A parsed location mapping a beacon minor to a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The beacon minor (e.g., 46)
    pub sub_id: u16,
    /// The label (e.g., "Salon (46)")
    pub label: String,
}

/// Parse a location from a string in the format "MINOR=LABEL".
///
/// # Example
/// ```
/// use beacon_proximity::location::parse_location;
///
/// let location = parse_location("46=Salon (46)").unwrap();
/// assert_eq!(location.sub_id, 46);
/// assert_eq!(location.label, "Salon (46)");
/// ```
pub fn parse_location(src: &str) -> Result<Location, String> {
    let (sub_id, label) = src
        .split_once('=')
        .ok_or_else(|| "invalid location: expected format MINOR=LABEL".to_string())?;
    let sub_id = sub_id
        .trim()
        .parse()
        .map_err(|_| format!("invalid location: '{sub_id}' is not a beacon minor"))?;
    Ok(Location {
        sub_id,
        label: label.into(),
    })
}

/// Convert a slice of `Location` values into a `LocationMap`.
///
/// Later entries win when a minor is listed twice.
pub fn to_map(locations: &[Location]) -> LocationMap {
    locations
        .iter()
        .map(|l| (l.sub_id, l.label.clone()))
        .collect()
}

/// Look up the label for `sub_id`.
pub fn resolve(sub_id: u16, locations: &LocationMap) -> Option<&str> {
    locations.get(&sub_id).map(String::as_str)
}

/// Look up the label for `sub_id`, falling back to [`UNKNOWN_LOCATION`].
pub fn resolve_label(sub_id: u16, locations: &LocationMap) -> &str {
    resolve(sub_id, locations).unwrap_or(UNKNOWN_LOCATION)
}
