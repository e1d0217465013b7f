//! # Hikemap
//!
//! The control layer of an interactive hiking map viewer.
//!
//! This library owns the map surface, brings up a fixed sequence of feature
//! plugins before the surface exists, reconciles the visible layer set and
//! keeps the live view synchronized with a persisted state record across
//! sessions.

pub mod core;
pub mod input;
pub mod layers;
pub mod plugins;
pub mod prelude;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::ControllerBuilder,
    config::ControllerOptions,
    controller::{MapContext, MapController},
    geo::{LatLng, LatLngBounds, Point},
    state::{JsonFileStateStore, LayerPair, MemoryStateStore, State, StateStore},
    view::{HeadlessView, MapView},
    viewport::Viewport,
};

pub use crate::layers::{
    manager::LayerManager,
    registry::{LayerCategory, LayerConfig, LayerHandle, LayerRegistry},
};

pub use crate::input::events::{MapEvent, MapEventKind};

pub use crate::ui::{
    controls::{ButtonHandler, ButtonId, Control, ControlButton, Position},
    select::SelectGroup,
};

pub use crate::plugins::{
    base::{BringUpContext, Plugin, PluginFactory, PluginHooks, PluginId},
    recommend::{recommend, RecommendLayers},
    settings::{Settings, SettingsControl},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("plugin '{plugin}' failed before map creation: {message}")]
    BeforeMap { plugin: String, message: String },

    #[error("plugin '{plugin}' did not finish before-map work within {timeout:?}")]
    BringUpTimeout {
        plugin: String,
        timeout: std::time::Duration,
    },

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("State error: {0}")]
    State(String),
}

/// Error type alias for convenience
pub type Error = MapError;
