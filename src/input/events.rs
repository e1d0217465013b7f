use crate::{core::geo::LatLng, ui::controls::ButtonId};
use std::fmt;
use std::str::FromStr;

/// Events emitted by the map surface
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Pan ended
    MoveEnd { center: LatLng },
    /// Zoom ended
    ZoomEnd { zoom: f64 },
    /// Layer was added to the map
    LayerAdd { layer_id: String },
    /// Layer was removed from the map
    LayerRemove { layer_id: String },
    /// Mouse/touch click on the map itself
    Click { lat_lng: LatLng },
    /// A control button was clicked
    ControlClick { button: ButtonId },
}

/// Discriminant of [`MapEvent`], used for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapEventKind {
    MoveEnd,
    ZoomEnd,
    LayerAdd,
    LayerRemove,
    Click,
    ControlClick,
}

impl MapEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::MoveEnd { .. } => MapEventKind::MoveEnd,
            MapEvent::ZoomEnd { .. } => MapEventKind::ZoomEnd,
            MapEvent::LayerAdd { .. } => MapEventKind::LayerAdd,
            MapEvent::LayerRemove { .. } => MapEventKind::LayerRemove,
            MapEvent::Click { .. } => MapEventKind::Click,
            MapEvent::ControlClick { .. } => MapEventKind::ControlClick,
        }
    }
}

impl MapEventKind {
    /// The event name as the surface spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            MapEventKind::MoveEnd => "moveend",
            MapEventKind::ZoomEnd => "zoomend",
            MapEventKind::LayerAdd => "layeradd",
            MapEventKind::LayerRemove => "layerremove",
            MapEventKind::Click => "click",
            MapEventKind::ControlClick => "controlclick",
        }
    }

    /// Parses a space separated list such as `"moveend zoomend"`
    pub fn parse_list(names: &str) -> Vec<MapEventKind> {
        names
            .split_whitespace()
            .filter_map(|name| match name.parse() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    log::warn!("ignoring unknown map event name '{}'", name);
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for MapEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapEventKind {
    type Err = crate::MapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "moveend" => Ok(MapEventKind::MoveEnd),
            "zoomend" => Ok(MapEventKind::ZoomEnd),
            "layeradd" => Ok(MapEventKind::LayerAdd),
            "layerremove" => Ok(MapEventKind::LayerRemove),
            "click" => Ok(MapEventKind::Click),
            "controlclick" => Ok(MapEventKind::ControlClick),
            other => Err(crate::MapError::Surface(format!(
                "unknown event name '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STATE_EVENTS;

    #[test]
    fn test_event_kind() {
        let event = MapEvent::LayerAdd {
            layer_id: "outdoors".to_string(),
        };
        assert_eq!(event.kind(), MapEventKind::LayerAdd);
        assert_eq!(event.kind().to_string(), "layeradd");
    }

    #[test]
    fn test_state_events_parse() {
        let kinds = MapEventKind::parse_list(STATE_EVENTS);
        assert_eq!(
            kinds,
            vec![
                MapEventKind::MoveEnd,
                MapEventKind::ZoomEnd,
                MapEventKind::LayerAdd,
                MapEventKind::LayerRemove,
            ]
        );
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        assert_eq!(
            MapEventKind::parse_list("moveend bogus"),
            vec![MapEventKind::MoveEnd]
        );
        assert!("bogus".parse::<MapEventKind>().is_err());
    }
}
