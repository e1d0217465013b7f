use crate::{
    core::{
        geo::LatLng,
        state::{LayerPair, State},
    },
    layers::registry::{LayerCategory, LayerRegistry},
    plugins::base::{BringUpContext, Plugin, PluginHooks},
    Result,
};
use async_trait::async_trait;

/// Picks the best layer of `category` for a session starting at `point`.
///
/// A single candidate always wins. Otherwise the first layer (in registry
/// order) whose coverage contains the point is chosen, falling back to the
/// last global layer. `None` if nothing qualifies.
pub fn recommend(registry: &LayerRegistry, category: LayerCategory, point: &LatLng) -> Option<String> {
    let candidates = registry.all_keys(Some(category));
    if let [only] = candidates.as_slice() {
        return Some(only.id.clone());
    }

    candidates
        .iter()
        .find(|layer| layer.coverage_contains(point))
        .or_else(|| candidates.iter().rev().find(|layer| layer.is_global()))
        .map(|layer| layer.id.clone())
}

/// Chooses the initial base layer for first-time visitors
pub struct RecommendLayers {
    category: LayerCategory,
}

impl RecommendLayers {
    pub fn new(_ctx: &mut BringUpContext<'_>) -> Result<Self> {
        Ok(Self::for_category(LayerCategory::default()))
    }

    pub fn for_category(category: LayerCategory) -> Self {
        Self { category }
    }
}

#[async_trait]
impl Plugin for RecommendLayers {
    fn name(&self) -> &str {
        "recommend-layers"
    }

    fn hooks(&self) -> PluginHooks {
        PluginHooks::default().before_map()
    }

    async fn before_map(&mut self, ctx: &mut BringUpContext<'_>) -> Result<()> {
        let state = ctx.state();
        if state.layers.is_some() {
            return Ok(());
        }
        let Some(center) = state.center else {
            return Ok(());
        };

        match recommend(ctx.registry(), self.category, &center) {
            Some(id) => {
                log::info!("recommended {} for {:?}", id, center);
                ctx.store()
                    .set(State::default().with_layers(LayerPair::base(id)));
            }
            None => log::debug!("no {} layer to recommend", self.category),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{config::ControllerOptions, geo::LatLngBounds, state::MemoryStateStore, state::StateStore},
        layers::registry::LayerConfig,
        plugins::base::PluginId,
    };

    fn norway() -> LatLngBounds {
        LatLngBounds::from_coords(57.9, 4.0, 71.2, 31.2)
    }

    fn registry(layers: Vec<LayerConfig>) -> LayerRegistry {
        LayerRegistry::new(layers).unwrap()
    }

    #[test]
    fn test_single_candidate_always_wins() {
        let registry = registry(vec![LayerConfig::new("topo", LayerCategory::Hiking, "Topo")
            .with_coverage(norway())]);
        assert_eq!(
            recommend(&registry, LayerCategory::Hiking, &LatLng::new(-33.9, 18.4)),
            Some("topo".to_string())
        );
    }

    #[test]
    fn test_containing_layer_wins_over_global() {
        let registry = registry(vec![
            LayerConfig::new("world", LayerCategory::Hiking, "World"),
            LayerConfig::new("topo", LayerCategory::Hiking, "Topo").with_coverage(norway()),
        ]);
        assert_eq!(
            recommend(&registry, LayerCategory::Hiking, &LatLng::new(61.0, 9.0)),
            Some("topo".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_last_global() {
        let registry = registry(vec![
            LayerConfig::new("world", LayerCategory::Hiking, "World"),
            LayerConfig::new("topo", LayerCategory::Hiking, "Topo").with_coverage(norway()),
            LayerConfig::new("world2", LayerCategory::Hiking, "World 2"),
        ]);
        assert_eq!(
            recommend(&registry, LayerCategory::Hiking, &LatLng::new(48.0, 2.3)),
            Some("world2".to_string())
        );
    }

    #[test]
    fn test_no_global_fallback() {
        let registry = registry(vec![
            LayerConfig::new("topo", LayerCategory::Hiking, "Topo").with_coverage(norway()),
            LayerConfig::new("se", LayerCategory::Hiking, "SE")
                .with_coverage(LatLngBounds::from_coords(55.3, 10.9, 69.1, 24.2)),
        ]);
        assert_eq!(
            recommend(&registry, LayerCategory::Hiking, &LatLng::new(48.0, 2.3)),
            None
        );
        assert_eq!(recommend(&registry, LayerCategory::Map, &LatLng::new(48.0, 2.3)), None);
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = LayerRegistry::builtin();
        let hiking = |lat, lng| recommend(&registry, LayerCategory::Hiking, &LatLng::new(lat, lng));
        assert_eq!(hiking(61.5, 8.3), Some("norway_topo".to_string()));
        assert_eq!(hiking(56.5, 14.0), Some("sweden_topo".to_string()));
        assert_eq!(hiking(46.5, 10.0), Some("outdoors".to_string()));
    }

    #[tokio::test]
    async fn test_before_map_only_fills_missing_layers() {
        let registry = LayerRegistry::builtin();
        let options = ControllerOptions::default();
        let mut plugin = RecommendLayers::for_category(LayerCategory::Hiking);

        let mut store = MemoryStateStore::with_state(
            State::default().with_view(LatLng::new(61.5, 8.3), 9.0),
        );
        let mut ctx = BringUpContext {
            state: &mut store,
            registry: &registry,
            options: &options,
            plugin: PluginId(0),
        };
        plugin.before_map(&mut ctx).await.unwrap();
        assert_eq!(store.state().layers, Some(LayerPair::base("norway_topo")));

        let mut store = MemoryStateStore::with_state(
            State::default()
                .with_view(LatLng::new(61.5, 8.3), 9.0)
                .with_layers(LayerPair::base("satellite")),
        );
        let mut ctx = BringUpContext {
            state: &mut store,
            registry: &registry,
            options: &options,
            plugin: PluginId(0),
        };
        plugin.before_map(&mut ctx).await.unwrap();
        assert_eq!(store.state().layers, Some(LayerPair::base("satellite")));
    }

    #[tokio::test]
    async fn test_before_map_without_center_does_nothing() {
        let registry = LayerRegistry::builtin();
        let options = ControllerOptions::default();
        let mut store = MemoryStateStore::new();
        let mut ctx = BringUpContext {
            state: &mut store,
            registry: &registry,
            options: &options,
            plugin: PluginId(0),
        };

        RecommendLayers::for_category(LayerCategory::Hiking)
            .before_map(&mut ctx)
            .await
            .unwrap();
        assert_eq!(store.state().layers, None);
    }
}
