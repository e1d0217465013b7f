//! Prelude module for common hikemap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use hikemap::prelude::*;`

pub use crate::core::{
    builder::ControllerBuilder,
    config::ControllerOptions,
    controller::{MapContext, MapController},
    geo::{LatLng, LatLngBounds, Point},
    state::{JsonFileStateStore, LayerPair, MemoryStateStore, State, StateStore},
    view::{HeadlessView, MapView, MarkerId, MarkerOptions},
    viewport::Viewport,
};

pub use crate::layers::{
    manager::LayerManager,
    registry::{LayerCategory, LayerConfig, LayerHandle, LayerRegistry},
};

pub use crate::plugins::{
    base::{BringUpContext, Plugin, PluginFactory, PluginHooks, PluginId},
    recommend::{recommend, RecommendLayers},
    settings::{Settings, SettingsControl},
};

pub use crate::input::events::{MapEvent, MapEventKind};

pub use crate::ui::{
    controls::{ButtonHandler, ButtonId, Control, ControlButton, Position},
    select::SelectGroup,
};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::future::BoxFuture;
