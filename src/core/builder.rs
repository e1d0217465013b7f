//! Controller builder and the bring-up sequence
//!
//! Plugins are registered as deferred constructors. [`ControllerBuilder::start`]
//! builds them one at a time, awaiting each plugin's before-map work before
//! the next is constructed, and only then creates the surface.

use crate::{
    core::{
        config::ControllerOptions,
        controller::{validate_layers, MapController, PluginEntry},
        geo::Point,
        state::{MemoryStateStore, State, StateStore},
        view::{HeadlessView, MapView},
    },
    layers::registry::LayerRegistry,
    plugins::{
        base::{BringUpContext, Plugin, PluginFactory, PluginId},
        recommend::RecommendLayers,
        settings::Settings,
    },
    prelude::{Arc, BoxFuture, Duration},
    MapError, Result,
};

type SurfaceFactory = Box<dyn FnOnce() -> Box<dyn MapView> + Send>;

/// Builder for a [`MapController`]
pub struct ControllerBuilder {
    options: ControllerOptions,
    registry: Arc<LayerRegistry>,
    store: Option<Box<dyn StateStore>>,
    surface: Option<SurfaceFactory>,
    plugins: Vec<PluginFactory>,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    /// Builtin registry, in-memory store, no plugins
    pub fn new() -> Self {
        Self {
            options: ControllerOptions::default(),
            registry: Arc::new(LayerRegistry::builtin()),
            store: None,
            surface: None,
            plugins: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default state record
    pub fn with_defaults(mut self, defaults: State) -> Self {
        self.options.defaults = defaults;
        self
    }

    pub fn with_registry(mut self, registry: impl Into<Arc<LayerRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_boxed_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the surface constructor; it runs after every before-map hook
    pub fn with_surface<F, V>(mut self, surface: F) -> Self
    where
        F: FnOnce() -> V + Send + 'static,
        V: MapView + 'static,
    {
        self.surface = Some(Box::new(move || Box::new(surface()) as Box<dyn MapView>));
        self
    }

    pub fn with_headless_surface(self, size: Point) -> Self {
        self.with_surface(move || HeadlessView::new(size))
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// Enable or disable the scale control
    pub fn with_scale_control(mut self, enabled: bool) -> Self {
        self.options.scale_control = enabled;
        self
    }

    /// Enable or disable the zoom control
    pub fn with_zoom_control(mut self, enabled: bool) -> Self {
        self.options.zoom_control = enabled;
        self
    }

    /// Fail bring-up when a single before-map hook runs longer than `timeout`
    pub fn with_bring_up_timeout(mut self, timeout: Duration) -> Self {
        self.options.bring_up_timeout = Some(timeout);
        self
    }

    /// Register a plugin constructor; registration order is bring-up order
    pub fn with_plugin<F, P>(mut self, factory: F) -> Self
    where
        F: FnOnce(&mut BringUpContext<'_>) -> Result<P> + Send + 'static,
        P: Plugin + 'static,
    {
        self.plugins.push(Box::new(move |ctx: &mut BringUpContext<'_>| {
            factory(ctx).map(|plugin| Box::new(plugin) as Box<dyn Plugin>)
        }));
        self
    }

    pub fn with_plugin_factory(mut self, factory: PluginFactory) -> Self {
        self.plugins.push(factory);
        self
    }

    /// The bundled plugins: layer recommendation, then settings
    pub fn with_default_plugins(self) -> Self {
        self.with_plugin(RecommendLayers::new).with_plugin(Settings::new)
    }

    /// Runs the full bring-up sequence.
    ///
    /// Resolves once every plugin is constructed and attached and the stored
    /// state has been applied to the surface.
    pub async fn start(self) -> Result<MapController> {
        let ControllerBuilder {
            options,
            registry,
            store,
            surface,
            plugins,
        } = self;

        let surface = surface.ok_or_else(|| MapError::Surface("no surface configured".to_string()))?;
        let mut store = store.unwrap_or_else(|| Box::new(MemoryStateStore::new()));

        validate_layers(store.as_mut(), &registry, &options.default_layers());

        let plugins = bring_up(plugins, store.as_mut(), &registry, &options).await?;
        log::info!("bring-up complete with {} plugins", plugins.len());

        MapController::surface_ready(surface(), store, registry, options, plugins)
    }
}

/// Constructs each plugin and awaits its before-map work, strictly in order
async fn bring_up(
    factories: Vec<PluginFactory>,
    store: &mut dyn StateStore,
    registry: &LayerRegistry,
    options: &ControllerOptions,
) -> Result<Vec<PluginEntry>> {
    let mut entries = Vec::with_capacity(factories.len());

    for (index, factory) in factories.into_iter().enumerate() {
        let mut ctx = BringUpContext {
            state: &mut *store,
            registry,
            options,
            plugin: PluginId(index),
        };

        let mut plugin = factory(&mut ctx).map_err(|e| MapError::BeforeMap {
            plugin: PluginId(index).to_string(),
            message: e.to_string(),
        })?;
        let hooks = plugin.hooks();
        let name = plugin.name().to_string();
        log::debug!("constructed plugin {} ({:?})", name, hooks);

        if hooks.before_map {
            let work = plugin.before_map(&mut ctx);
            settle(&name, work, options.bring_up_timeout).await?;
            log::debug!("plugin {} finished before-map work", name);
        }

        entries.push(PluginEntry { plugin, hooks });
    }

    Ok(entries)
}

/// Awaits one before-map hook; its failure names the plugin
async fn settle(
    name: &str,
    work: BoxFuture<'_, Result<()>>,
    timeout: Option<Duration>,
) -> std::result::Result<(), MapError> {
    let outcome = match timeout {
        #[cfg(feature = "tokio-runtime")]
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| MapError::BringUpTimeout {
                plugin: name.to_string(),
                timeout: limit,
            })?,
        #[cfg(not(feature = "tokio-runtime"))]
        Some(_) => {
            log::warn!("bring-up timeout for {} ignored without tokio-runtime", name);
            work.await
        }
        None => work.await,
    };

    outcome.map_err(|e| MapError::BeforeMap {
        plugin: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::base::BasePlugin;

    #[tokio::test]
    async fn test_start_requires_surface() {
        let result = ControllerBuilder::new().start().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_plugins_without_hooks_are_kept() {
        let controller = ControllerBuilder::new()
            .with_headless_surface(Point::new(800.0, 600.0))
            .with_plugin(|_ctx: &mut BringUpContext<'_>| Ok(BasePlugin::new("noop")))
            .start()
            .await
            .unwrap();

        assert_eq!(controller.plugin_names(), vec!["noop"]);
    }

    #[tokio::test]
    async fn test_constructor_failure_halts_bring_up() {
        let result = ControllerBuilder::new()
            .with_headless_surface(Point::new(800.0, 600.0))
            .with_plugin(|_ctx: &mut BringUpContext<'_>| -> Result<BasePlugin> {
                Err(MapError::Plugin("broken".to_string()).into())
            })
            .start()
            .await;

        let err = result.err().unwrap();
        assert!(err.to_string().contains("broken"));
    }
}
