//! Layer settings panel
//!
//! Keeps the user's base layer, overlay and category selection, remembers
//! the last base layer chosen in each category and pushes every change to
//! the controller and the state record.

use crate::{
    core::{
        controller::MapContext,
        geo::LatLngBounds,
        state::{LayerPair, State},
    },
    input::events::{MapEvent, MapEventKind},
    layers::registry::{LayerCategory, LayerRegistry},
    plugins::base::{BringUpContext, Plugin, PluginHooks},
    ui::{
        controls::{ButtonId, Position},
        select::SelectGroup,
    },
    MapError, Result,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const TOGGLE_COMMAND: &str = "toggle";
pub const CLOSE_COMMAND: &str = "close";

/// The selection controls of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsControl {
    MapType,
    Layer,
    Overlay,
}

pub struct Settings {
    map_layer: String,
    overlay: Option<String>,
    map_type: LayerCategory,
    default_layers: BTreeMap<LayerCategory, String>,
    map_type_buttons: SelectGroup,
    layer_buttons: BTreeMap<LayerCategory, SelectGroup>,
    overlay_buttons: SelectGroup,
    visible: bool,
    toggle_button: Option<ButtonId>,
}

impl Settings {
    pub fn new(ctx: &mut BringUpContext<'_>) -> Result<Self> {
        let defaults = ctx.default_layers();
        let layers = ctx.state().layers.clone().unwrap_or_else(|| defaults.clone());
        let map_layer = layers
            .base
            .or(defaults.base)
            .ok_or_else(|| MapError::Layer("no base layer to start from".to_string()))?;

        let registry = ctx.registry();
        let map_type = registry.map_type_of(&map_layer).unwrap_or_else(|| {
            log::warn!("base layer '{}' is not registered", map_layer);
            LayerCategory::default()
        });
        let mut default_layers = ctx
            .state()
            .default_layers
            .clone()
            .unwrap_or_else(|| BTreeMap::from([(map_type, map_layer.clone())]));
        default_layers.retain(|category, id| {
            let known = registry.map_type_of(id) == Some(*category);
            if !known {
                log::info!("forgetting unregistered {} layer '{}'", category, id);
            }
            known
        });

        let mut settings = Self {
            map_layer,
            overlay: layers.overlay,
            map_type,
            default_layers,
            map_type_buttons: SelectGroup::new(
                LayerCategory::BASE.map(|category| (category.as_str(), title_case(category.as_str()))),
            ),
            layer_buttons: LayerCategory::BASE
                .into_iter()
                .filter(|&category| registry.all_keys(Some(category)).len() > 1)
                .map(|category| (category, layer_buttons_for(registry, category)))
                .collect(),
            overlay_buttons: layer_buttons_for(registry, LayerCategory::Overlay).toggle(),
            visible: false,
            toggle_button: None,
        };
        settings.update_buttons();
        Ok(settings)
    }

    pub fn map_layer(&self) -> &str {
        &self.map_layer
    }

    pub fn overlay(&self) -> Option<&str> {
        self.overlay.as_deref()
    }

    pub fn map_type(&self) -> LayerCategory {
        self.map_type
    }

    pub fn default_layers(&self) -> &BTreeMap<LayerCategory, String> {
        &self.default_layers
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle_button(&self) -> Option<ButtonId> {
        self.toggle_button
    }

    pub fn map_type_buttons(&self) -> &SelectGroup {
        &self.map_type_buttons
    }

    /// `None` for categories with a single layer
    pub fn layer_buttons(&self, category: LayerCategory) -> Option<&SelectGroup> {
        self.layer_buttons.get(&category)
    }

    pub fn overlay_buttons(&self) -> &SelectGroup {
        &self.overlay_buttons
    }

    /// Switches category, restoring the layer last chosen in it
    pub fn select_map_type(&mut self, category: LayerCategory, ctx: &mut MapContext<'_>) -> Result<()> {
        let remembered = self
            .default_layers
            .get(&category)
            .filter(|id| ctx.registry().map_type_of(id) == Some(category));
        let layer_id = match remembered {
            Some(id) => id.clone(),
            None => ctx
                .registry()
                .all_keys(Some(category))
                .first()
                .map(|layer| layer.id.clone())
                .ok_or_else(|| MapError::Layer(format!("no layers in category {}", category)))?,
        };
        self.map_type = category;
        self.apply_layers(layer_id, self.overlay.clone(), ctx);
        Ok(())
    }

    /// Chooses a base layer and remembers it for its category
    pub fn select_map_layer(&mut self, id: &str, ctx: &mut MapContext<'_>) -> Result<()> {
        let category = ctx
            .registry()
            .map_type_of(id)
            .filter(|category| !category.is_overlay())
            .ok_or_else(|| MapError::Layer(format!("'{}' is not a base layer", id)))?;
        self.default_layers.insert(category, id.to_string());
        self.map_type = category;
        self.apply_layers(id.to_string(), self.overlay.clone(), ctx);
        Ok(())
    }

    /// Selecting the active overlay clears it; any other replaces it
    pub fn select_overlay(&mut self, id: &str, ctx: &mut MapContext<'_>) -> Result<()> {
        if ctx.registry().map_type_of(id) != Some(LayerCategory::Overlay) {
            return Err(MapError::Layer(format!("'{}' is not an overlay", id)).into());
        }
        let overlay = (self.overlay.as_deref() != Some(id)).then(|| id.to_string());
        self.apply_layers(self.map_layer.clone(), overlay, ctx);
        Ok(())
    }

    /// Routes a click on one of the panel's buttons.
    ///
    /// Returns whether the selection changed; clicks on disabled buttons and
    /// on the active non-toggle button do nothing.
    pub fn click(&mut self, control: SettingsControl, name: &str, ctx: &mut MapContext<'_>) -> Result<bool> {
        match control {
            SettingsControl::MapType => match self.map_type_buttons.click(name) {
                Some(Some(value)) => {
                    let result = match value.parse::<LayerCategory>() {
                        Ok(category) => self.select_map_type(category, ctx),
                        Err(e) => Err(e.into()),
                    };
                    if result.is_err() {
                        self.update_buttons();
                    }
                    result.map(|_| true)
                }
                _ => Ok(false),
            },
            SettingsControl::Layer => {
                let Some(group) = self.layer_buttons.get_mut(&self.map_type) else {
                    return Ok(false);
                };
                match group.click(name) {
                    Some(Some(id)) => self.select_map_layer(&id, ctx).map(|_| true),
                    _ => Ok(false),
                }
            }
            SettingsControl::Overlay => match self.overlay_buttons.click(name) {
                Some(_) => self.select_overlay(name, ctx).map(|_| true),
                None => Ok(false),
            },
        }
    }

    pub fn toggle_settings(&mut self, ctx: &mut MapContext<'_>) {
        self.visible = !self.visible;
        if self.visible {
            ctx.subscribe(MapEventKind::MoveEnd);
            self.update_available_layers(ctx);
        } else {
            ctx.unsubscribe(MapEventKind::MoveEnd);
        }
    }

    pub fn close_settings(&mut self, ctx: &mut MapContext<'_>) {
        self.visible = false;
        ctx.unsubscribe(MapEventKind::MoveEnd);
    }

    fn apply_layers(&mut self, map_layer: String, overlay: Option<String>, ctx: &mut MapContext<'_>) {
        self.map_layer = map_layer;
        self.overlay = overlay;
        ctx.set_layers(LayerPair::new(Some(self.map_layer.clone()), self.overlay.clone()));
        ctx.set_state(State {
            default_layers: Some(self.default_layers.clone()),
            ..State::default()
        });
        self.update_buttons();
        self.update_available_layers(ctx);
    }

    fn update_buttons(&mut self) {
        self.map_type_buttons.set(Some(self.map_type.as_str()));
        for (category, group) in self.layer_buttons.iter_mut() {
            group.set_visible(*category == self.map_type);
        }
        if let Some(group) = self.layer_buttons.get_mut(&self.map_type) {
            group.set(Some(&self.map_layer));
        }
        self.overlay_buttons.set(self.overlay.as_deref());
    }

    fn update_available_layers(&mut self, ctx: &MapContext<'_>) {
        let view = ctx.view().bounds();
        let registry = ctx.registry();
        if let Some(group) = self.layer_buttons.get_mut(&self.map_type) {
            group.set_disabled(unavailable_layers(registry, self.map_type, &view));
        }
        self.overlay_buttons
            .set_disabled(unavailable_layers(registry, LayerCategory::Overlay, &view));
    }
}

#[async_trait]
impl Plugin for Settings {
    fn name(&self) -> &str {
        "settings"
    }

    fn hooks(&self) -> PluginHooks {
        PluginHooks::default().set_map().on_event().on_command()
    }

    fn set_map(&mut self, ctx: &mut MapContext<'_>) -> Result<()> {
        self.toggle_button = Some(ctx.create_button("layers", Position::TopRight, TOGGLE_COMMAND)?);
        Ok(())
    }

    fn on_event(&mut self, event: &MapEvent, ctx: &mut MapContext<'_>) -> Result<()> {
        if let MapEvent::MoveEnd { .. } = event {
            self.update_available_layers(ctx);
        }
        Ok(())
    }

    fn on_command(&mut self, command: &str, ctx: &mut MapContext<'_>) -> Result<()> {
        match command {
            TOGGLE_COMMAND => self.toggle_settings(ctx),
            CLOSE_COMMAND => self.close_settings(ctx),
            other => log::warn!("settings: unknown command '{}'", other),
        }
        Ok(())
    }
}

fn layer_buttons_for(registry: &LayerRegistry, category: LayerCategory) -> SelectGroup {
    SelectGroup::new(
        registry
            .all_keys(Some(category))
            .into_iter()
            .map(|layer| (layer.id.clone(), layer.title.clone())),
    )
}

/// Layers of `category` whose coverage does not contain `view`
fn unavailable_layers<'r>(
    registry: &'r LayerRegistry,
    category: LayerCategory,
    view: &LatLngBounds,
) -> Vec<&'r str> {
    registry
        .all_keys(Some(category))
        .into_iter()
        .filter(|layer| !layer.covers_view(view))
        .map(|layer| layer.id.as_str())
        .collect()
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
