//! Compiled-in defaults shared by the controller and the bundled plugins.

use crate::core::geo::{LatLng, LatLngBounds};

/// Base layer shown when nothing valid is stored.
pub const DEFAULT_BASE_LAYER: &str = "outdoors";

/// Routing backend recorded for a fresh session.
pub const DEFAULT_ROUTING_SERVICE: &str = "mapbox";

/// Events after which the live view is read back into the state record.
pub const STATE_EVENTS: &str = "moveend zoomend layeradd layerremove";

/// User agents on which zoom is available through pinch gestures.
pub const PINCH_ZOOM_USER_AGENT: &str = r"(?i)(iPhone|iPod|iPad).*AppleWebKit";

/// Class prefix shared by every control button.
pub const MAP_BUTTON_CLASS: &str = "map-button";

/// Neither geographically nor politically correct.
pub fn europe_bounds() -> LatLngBounds {
    LatLngBounds::new(LatLng::new(35.0, -15.0), LatLng::new(65.0, 35.0))
}
