//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Fixed planner rules and output schema
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// Per-trip context template
pub const ITINERARY: &str = include_str!("../../prompts/itinerary.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "system" => Some(SYSTEM),
        "itinerary" => Some(ITINERARY),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_system() {
        let system = get_embedded("system").unwrap();
        assert!(system.contains("travel planner"));
        assert!(system.contains("slow = 2-3"));
        assert!(system.contains("\"days\""));
        assert!(system.contains("travel_to_next"));
    }

    #[test]
    fn test_get_embedded_itinerary() {
        let itinerary = get_embedded("itinerary").unwrap();
        assert!(itinerary.contains("{{destination}}"));
        assert!(itinerary.contains("{{day_count}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
