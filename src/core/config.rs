//! Controller options
//!
//! Everything the controller needs to know before it brings up a session:
//! the default state record, which built-in controls to attach and how long
//! plugin bring-up may take.

use crate::{
    constants::{
        europe_bounds, DEFAULT_BASE_LAYER, DEFAULT_ROUTING_SERVICE, PINCH_ZOOM_USER_AGENT,
        STATE_EVENTS,
    },
    core::state::{LayerPair, State},
    input::events::MapEventKind,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static PINCH_ZOOM: Lazy<Regex> =
    Lazy::new(|| Regex::new(PINCH_ZOOM_USER_AGENT).expect("pinch-zoom pattern is valid"));

/// True for user agents where zoom is done with pinch gestures
pub fn is_pinch_zoom_device(user_agent: &str) -> bool {
    PINCH_ZOOM.is_match(user_agent)
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Written into the state record for every key it lacks
    pub defaults: State,
    /// Client identification used to decide on the zoom control
    pub user_agent: Option<String>,
    pub scale_control: bool,
    pub zoom_control: bool,
    pub focus_on_create: bool,
    /// Upper bound for each plugin's before-map work; `None` waits forever
    pub bring_up_timeout: Option<Duration>,
    /// Space separated event names after which state is saved
    pub state_events: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            defaults: State::default()
                .with_bounds(europe_bounds())
                .with_layers(LayerPair::base(DEFAULT_BASE_LAYER))
                .with_value("routingService", DEFAULT_ROUTING_SERVICE.into()),
            user_agent: None,
            scale_control: true,
            zoom_control: true,
            focus_on_create: true,
            bring_up_timeout: None,
            state_events: STATE_EVENTS.to_string(),
        }
    }
}

impl ControllerOptions {
    /// Default `[base, overlay]` pair used when stored layers are invalid
    pub fn default_layers(&self) -> LayerPair {
        self.defaults.layers.clone().unwrap_or_default()
    }

    pub fn is_pinch_zoom_device(&self) -> bool {
        self.user_agent.as_deref().is_some_and(is_pinch_zoom_device)
    }

    /// Whether the zoom control should be attached
    pub fn wants_zoom_control(&self) -> bool {
        self.zoom_control && !self.is_pinch_zoom_device()
    }

    pub fn state_event_kinds(&self) -> Vec<MapEventKind> {
        MapEventKind::parse_list(&self.state_events)
    }
}
