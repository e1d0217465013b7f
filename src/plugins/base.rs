use crate::{
    core::{
        config::ControllerOptions,
        controller::MapContext,
        state::{LayerPair, State, StateStore},
    },
    input::events::MapEvent,
    layers::registry::LayerRegistry,
    traits::AsAny,
    Result,
};
use async_trait::async_trait;
use std::fmt;

/// Registration index of a plugin; also its bring-up position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub(crate) usize);

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin#{}", self.0)
    }
}

/// Which optional hooks a plugin implements.
///
/// Read once, right after construction; hooks not flagged here are never
/// called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginHooks {
    pub before_map: bool,
    pub set_map: bool,
    pub on_event: bool,
    pub on_command: bool,
}

impl PluginHooks {
    pub const NONE: PluginHooks = PluginHooks {
        before_map: false,
        set_map: false,
        on_event: false,
        on_command: false,
    };

    pub fn before_map(mut self) -> Self {
        self.before_map = true;
        self
    }

    pub fn set_map(mut self) -> Self {
        self.set_map = true;
        self
    }

    pub fn on_event(mut self) -> Self {
        self.on_event = true;
        self
    }

    pub fn on_command(mut self) -> Self {
        self.on_command = true;
        self
    }
}

/// What a plugin sees before the surface exists
pub struct BringUpContext<'a> {
    pub(crate) state: &'a mut dyn StateStore,
    pub(crate) registry: &'a LayerRegistry,
    pub(crate) options: &'a ControllerOptions,
    pub(crate) plugin: PluginId,
}

impl<'a> BringUpContext<'a> {
    pub fn state(&self) -> &State {
        self.state.state()
    }

    pub fn store(&mut self) -> &mut dyn StateStore {
        &mut *self.state
    }

    pub fn registry(&self) -> &LayerRegistry {
        self.registry
    }

    pub fn options(&self) -> &ControllerOptions {
        self.options
    }

    pub fn default_layers(&self) -> LayerPair {
        self.options.default_layers()
    }

    pub fn plugin_id(&self) -> PluginId {
        self.plugin
    }
}

/// A feature module with optional lifecycle hooks
#[async_trait]
pub trait Plugin: AsAny + Send {
    fn name(&self) -> &str;

    fn hooks(&self) -> PluginHooks {
        PluginHooks::NONE
    }

    /// Asynchronous work that must finish before the next plugin is built
    async fn before_map(&mut self, _ctx: &mut BringUpContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once the surface exists
    fn set_map(&mut self, _ctx: &mut MapContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called for events the plugin subscribed to
    fn on_event(&mut self, _event: &MapEvent, _ctx: &mut MapContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when one of the plugin's buttons is clicked
    fn on_command(&mut self, _command: &str, _ctx: &mut MapContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Deferred plugin constructor, run inside the bring-up chain
pub type PluginFactory = Box<dyn FnOnce(&mut BringUpContext<'_>) -> Result<Box<dyn Plugin>> + Send>;

/// A named plugin with no hooks
pub struct BasePlugin {
    pub name: String,
}

impl BasePlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Plugin for BasePlugin {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_flags() {
        let hooks = PluginHooks::default().before_map().on_command();
        assert!(hooks.before_map && hooks.on_command);
        assert!(!hooks.set_map && !hooks.on_event);
        assert_eq!(BasePlugin::new("noop").hooks(), PluginHooks::NONE);
    }
}
