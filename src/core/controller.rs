//! The map controller: owns the surface, the state store and the plugins.
//!
//! A controller only exists once bring-up has finished (see
//! [`ControllerBuilder::start`](crate::core::builder::ControllerBuilder::start)).
//! From then on the host drives it by calling [`MapController::process_events`]
//! whenever the surface may have queued events.

use crate::{
    core::{
        config::ControllerOptions,
        geo::LatLng,
        state::{LayerPair, State, StateStore},
        view::{MapView, MarkerId, MarkerOptions},
    },
    input::events::{MapEvent, MapEventKind},
    layers::{manager::LayerManager, registry::LayerRegistry},
    plugins::base::{Plugin, PluginHooks, PluginId},
    prelude::{Arc, HashSet},
    ui::controls::{ButtonCallback, ButtonHandler, ButtonId, Control, ControlButton, Position},
    MapError, Result,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Upper bound on event rounds drained by one `process_events` call
const MAX_EVENT_ROUNDS: usize = 32;

/// Replaces each missing or unknown slot of the stored layer pair with the
/// matching default slot.
///
/// Only runs when the record has a `layers` field; running it twice changes
/// nothing the second time.
pub fn validate_layers(store: &mut dyn StateStore, registry: &LayerRegistry, defaults: &LayerPair) {
    let Some(stored) = store.state().layers.clone() else {
        return;
    };

    let valid = |slot: &Option<String>| slot.as_deref().is_some_and(|id| registry.contains(id));
    let validated = LayerPair::new(
        if valid(&stored.base) {
            stored.base.clone()
        } else {
            defaults.base.clone()
        },
        if valid(&stored.overlay) {
            stored.overlay.clone()
        } else {
            defaults.overlay.clone()
        },
    );

    if validated != stored {
        log::info!("stored layers {:?} replaced by {:?}", stored, validated);
        store.set(State::default().with_layers(validated));
    }
}

pub(crate) struct PluginEntry {
    pub(crate) plugin: Box<dyn Plugin>,
    pub(crate) hooks: PluginHooks,
}

/// Everything plugins may touch through a [`MapContext`]
pub(crate) struct ControllerCore {
    view: Box<dyn MapView>,
    store: Box<dyn StateStore>,
    registry: Arc<LayerRegistry>,
    options: ControllerOptions,
    layers: LayerManager,
    buttons: BTreeMap<ButtonId, Option<ButtonHandler>>,
    next_button: u32,
    next_marker: u64,
    subscriptions: HashSet<(PluginId, MapEventKind)>,
    state_events: Vec<MapEventKind>,
    tracking: bool,
}

impl ControllerCore {
    fn set_layers(&mut self, layers: LayerPair) {
        self.layers
            .reconcile(self.view.as_mut(), &self.registry, layers);
    }

    /// Center and zoom win over bounds
    fn apply_state(&mut self, state: &State) {
        if let Some(layers) = &state.layers {
            self.set_layers(layers.clone());
        }

        match (state.center, state.zoom, &state.bounds) {
            (Some(center), Some(zoom), _) => self.view.set_view(center, zoom),
            (_, _, Some(bounds)) => self.view.fit_bounds(bounds),
            _ => log::debug!("state has no view to apply"),
        }
    }

    fn read_state(&self) -> State {
        State {
            layers: self.layers.active().cloned(),
            center: Some(self.view.center()),
            zoom: Some(self.view.zoom()),
            ..State::default()
        }
    }

    fn save_state(&mut self) {
        let live = self.read_state();
        self.store.set(live);
        if let Err(e) = self.store.save() {
            log::warn!("failed to save state: {}", e);
        }
    }

    fn create_button(&mut self, class_name: &str, position: Position, handler: ButtonHandler) -> ButtonId {
        self.next_button += 1;
        let id = ButtonId(self.next_button);
        self.view
            .add_control(Control::Button(ControlButton::new(id, class_name, position)));
        log::debug!("created {} ({}) -> {:?}", id, class_name, handler);
        self.buttons.insert(id, Some(handler));
        id
    }

    fn add_marker(&mut self, position: LatLng, options: &MarkerOptions) -> MarkerId {
        self.next_marker += 1;
        let id = MarkerId(self.next_marker);
        self.view.add_marker(id, position, options);
        id
    }
}

/// A plugin's handle on the running controller
pub struct MapContext<'a> {
    core: &'a mut ControllerCore,
    plugin: Option<PluginId>,
}

impl<'a> MapContext<'a> {
    /// The plugin this context was handed to; `None` for host callbacks
    pub fn plugin_id(&self) -> Option<PluginId> {
        self.plugin
    }

    pub fn set_layers(&mut self, layers: LayerPair) {
        self.core.set_layers(layers);
    }

    pub fn layers(&self) -> Option<&LayerPair> {
        self.core.layers.active()
    }

    pub fn view(&self) -> &dyn MapView {
        self.core.view.as_ref()
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.core.registry
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.core.options
    }

    pub fn state(&self) -> &State {
        self.core.store.state()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.core.store.get(key)
    }

    /// Merges `patch` into the state record
    pub fn set_state(&mut self, patch: State) {
        self.core.store.set(patch);
    }

    pub fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.core.store.set_value(key, value)
    }

    /// Creates a button whose clicks reach this plugin's `on_command`
    pub fn create_button(&mut self, class_name: &str, position: Position, command: &str) -> Result<ButtonId> {
        let plugin = self
            .plugin
            .ok_or_else(|| MapError::Plugin("command buttons need a plugin context".to_string()))?;
        Ok(self.core.create_button(
            class_name,
            position,
            ButtonHandler::Plugin {
                plugin,
                command: command.to_string(),
            },
        ))
    }

    pub fn create_callback_button(
        &mut self,
        class_name: &str,
        position: Position,
        callback: ButtonCallback,
    ) -> ButtonId {
        self.core
            .create_button(class_name, position, ButtonHandler::Callback(callback))
    }

    /// Starts delivering `kind` events to this plugin
    pub fn subscribe(&mut self, kind: MapEventKind) {
        if let Some(plugin) = self.plugin {
            self.core.subscriptions.insert((plugin, kind));
        }
    }

    pub fn unsubscribe(&mut self, kind: MapEventKind) {
        if let Some(plugin) = self.plugin {
            self.core.subscriptions.remove(&(plugin, kind));
        }
    }

    pub fn add_marker(&mut self, position: LatLng, options: &MarkerOptions) -> MarkerId {
        self.core.add_marker(position, options)
    }

    pub fn remove_marker(&mut self, id: MarkerId) {
        self.core.view.remove_marker(id);
    }
}

/// A running map session
pub struct MapController {
    core: ControllerCore,
    plugins: Vec<PluginEntry>,
}

impl MapController {
    /// Creates the surface-side half of the session and runs the steps that
    /// follow plugin bring-up.
    pub(crate) fn surface_ready(
        view: Box<dyn MapView>,
        store: Box<dyn StateStore>,
        registry: Arc<LayerRegistry>,
        options: ControllerOptions,
        plugins: Vec<PluginEntry>,
    ) -> Result<Self> {
        let state_events = options.state_event_kinds();
        let mut controller = Self {
            core: ControllerCore {
                view,
                store,
                registry,
                options,
                layers: LayerManager::new(),
                buttons: BTreeMap::new(),
                next_button: 0,
                next_marker: 0,
                subscriptions: HashSet::default(),
                state_events,
                tracking: false,
            },
            plugins,
        };

        if controller.core.options.scale_control {
            controller
                .core
                .view
                .add_control(Control::Scale { imperial: false });
        }
        if controller.core.options.focus_on_create {
            controller.core.view.focus();
        }
        log::info!("map surface created");

        for (index, entry) in controller.plugins.iter_mut().enumerate() {
            if !entry.hooks.set_map {
                continue;
            }
            let mut ctx = MapContext {
                core: &mut controller.core,
                plugin: Some(PluginId(index)),
            };
            entry.plugin.set_map(&mut ctx).map_err(|e| {
                MapError::Plugin(format!("{} failed to attach: {}", entry.plugin.name(), e))
            })?;
        }

        if controller.core.options.wants_zoom_control() {
            controller.core.view.add_control(Control::Zoom {
                position: Position::TopLeft,
            });
        } else {
            log::debug!("zoom control skipped");
        }

        let missing = controller
            .core
            .store
            .state()
            .missing_from(&controller.core.options.defaults);
        controller.core.store.set(missing);

        let initial = controller.core.store.state().clone();
        controller.core.apply_state(&initial);

        let discarded = controller.core.view.take_events();
        log::debug!("discarded {} events queued during bring-up", discarded.len());
        controller.core.tracking = true;

        Ok(controller)
    }

    /// Reconciles the surface with `layers` (see [`LayerManager::reconcile`])
    pub fn set_layers(&mut self, layers: LayerPair) {
        self.core.set_layers(layers);
    }

    pub fn layers(&self) -> Option<&LayerPair> {
        self.core.layers.active()
    }

    pub fn apply_state(&mut self, state: &State) {
        self.core.apply_state(state);
    }

    /// Live zoom, center and layers
    pub fn read_state(&self) -> State {
        self.core.read_state()
    }

    /// Copies the live view into the record and flushes it; failures are logged
    pub fn save_state(&mut self) {
        self.core.save_state();
    }

    pub fn state(&self) -> &State {
        self.core.store.state()
    }

    pub fn store(&self) -> &dyn StateStore {
        self.core.store.as_ref()
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.core.registry
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.core.options
    }

    pub fn view(&self) -> &dyn MapView {
        self.core.view.as_ref()
    }

    /// Concrete surface access for the host
    pub fn view_mut<V: MapView + 'static>(&mut self) -> Option<&mut V> {
        let view: &mut dyn MapView = self.core.view.as_mut();
        view.as_any_mut().downcast_mut::<V>()
    }

    pub fn view_as<V: MapView + 'static>(&self) -> Option<&V> {
        let view: &dyn MapView = self.core.view.as_ref();
        view.as_any().downcast_ref::<V>()
    }

    /// Plugin names in bring-up order
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|entry| entry.plugin.name()).collect()
    }

    pub fn plugin<T: Plugin + 'static>(&self) -> Option<&T> {
        self.plugins.iter().find_map(|entry| {
            let plugin: &dyn Plugin = entry.plugin.as_ref();
            plugin.as_any().downcast_ref::<T>()
        })
    }

    /// Runs `f` against the first plugin of type `T` with a context bound to it
    pub fn with_plugin<T, R, F>(&mut self, f: F) -> Option<R>
    where
        T: Plugin + 'static,
        F: FnOnce(&mut T, &mut MapContext<'_>) -> R,
    {
        for (index, entry) in self.plugins.iter_mut().enumerate() {
            let plugin: &mut dyn Plugin = entry.plugin.as_mut();
            if let Some(plugin) = plugin.as_any_mut().downcast_mut::<T>() {
                let mut ctx = MapContext {
                    core: &mut self.core,
                    plugin: Some(PluginId(index)),
                };
                return Some(f(plugin, &mut ctx));
            }
        }
        None
    }

    pub fn create_button(&mut self, class_name: &str, position: Position, handler: ButtonHandler) -> ButtonId {
        self.core.create_button(class_name, position, handler)
    }

    pub fn add_marker(&mut self, position: LatLng, options: &MarkerOptions) -> MarkerId {
        self.core.add_marker(position, options)
    }

    pub fn remove_marker(&mut self, id: MarkerId) {
        self.core.view.remove_marker(id);
    }

    /// Runs the handler of `id`; returns false for unknown buttons
    pub fn click_button(&mut self, id: ButtonId) -> Result<bool> {
        let Some(mut handler) = self.core.buttons.get_mut(&id).and_then(Option::take) else {
            return Ok(false);
        };

        let result = match &mut handler {
            ButtonHandler::Plugin { plugin, command } => match self.plugins.get_mut(plugin.0) {
                Some(entry) if entry.hooks.on_command => {
                    let mut ctx = MapContext {
                        core: &mut self.core,
                        plugin: Some(*plugin),
                    };
                    entry.plugin.on_command(command, &mut ctx)
                }
                Some(entry) => {
                    log::warn!("{} has no command hook, '{}' dropped", entry.plugin.name(), command);
                    Ok(())
                }
                None => Err(MapError::Plugin(format!("{} is not registered", plugin)).into()),
            },
            ButtonHandler::Callback(callback) => callback(&mut MapContext {
                core: &mut self.core,
                plugin: None,
            }),
        };

        if let Some(slot) = self.core.buttons.get_mut(&id) {
            *slot = Some(handler);
        }
        result.map(|_| true)
    }

    /// Drains and handles surface events until none are left.
    ///
    /// Returns every event handled, in order. A failing handler does not stop
    /// the events behind it; the first failure is returned once the queue is
    /// empty.
    pub fn process_events(&mut self) -> Result<Vec<MapEvent>> {
        let mut handled = Vec::new();
        let mut first_error = None;
        let mut drained = false;
        for _ in 0..MAX_EVENT_ROUNDS {
            let events = self.core.view.take_events();
            if events.is_empty() {
                drained = true;
                break;
            }
            for event in &events {
                if let Err(e) = self.handle_event(event) {
                    log::warn!("handling {:?} failed: {}", event.kind(), e);
                    first_error.get_or_insert(e);
                }
            }
            handled.extend(events);
        }
        if !drained {
            log::warn!("events still pending after {} rounds", MAX_EVENT_ROUNDS);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(handled),
        }
    }

    pub fn handle_event(&mut self, event: &MapEvent) -> Result<()> {
        let kind = event.kind();

        if let MapEvent::ControlClick { button } = event {
            self.click_button(*button)?;
        }

        if self.core.tracking && self.core.state_events.contains(&kind) {
            self.core.save_state();
        }

        for (index, entry) in self.plugins.iter_mut().enumerate() {
            let id = PluginId(index);
            if !entry.hooks.on_event || !self.core.subscriptions.contains(&(id, kind)) {
                continue;
            }
            let mut ctx = MapContext {
                core: &mut self.core,
                plugin: Some(id),
            };
            entry.plugin.on_event(event, &mut ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::MemoryStateStore;
    use pretty_assertions::assert_eq;

    fn defaults() -> LayerPair {
        LayerPair::base("outdoors")
    }

    #[test]
    fn test_validation_replaces_unknown_slots() {
        let registry = LayerRegistry::builtin();
        let mut store = MemoryStateStore::with_state(
            State::default().with_layers(LayerPair::base("gone").with_overlay("trails")),
        );

        validate_layers(&mut store, &registry, &defaults());
        assert_eq!(
            store.state().layers,
            Some(LayerPair::base("outdoors").with_overlay("trails"))
        );
    }

    #[test]
    fn test_validation_drops_unknown_overlay() {
        let registry = LayerRegistry::builtin();
        let mut store = MemoryStateStore::with_state(
            State::default().with_layers(LayerPair::base("satellite").with_overlay("gone")),
        );

        validate_layers(&mut store, &registry, &defaults());
        assert_eq!(store.state().layers, Some(LayerPair::base("satellite")));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let registry = LayerRegistry::builtin();
        let mut store = MemoryStateStore::with_state(
            State::default().with_layers(LayerPair::new(None, Some("gone".into()))),
        );

        validate_layers(&mut store, &registry, &defaults());
        let once = store.state().clone();
        validate_layers(&mut store, &registry, &defaults());
        assert_eq!(store.state(), &once);
        assert_eq!(once.layers, Some(defaults()));
    }

    #[test]
    fn test_validation_skips_missing_layers() {
        let registry = LayerRegistry::builtin();
        let mut store = MemoryStateStore::new();

        validate_layers(&mut store, &registry, &defaults());
        assert_eq!(store.state().layers, None);
    }
}
