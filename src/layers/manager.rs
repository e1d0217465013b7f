use crate::{
    core::{state::LayerPair, view::MapView},
    layers::registry::LayerRegistry,
};

/// Owns the active layer set and keeps the surface in step with it
#[derive(Debug, Clone, Default)]
pub struct LayerManager {
    /// `None` until the first reconciliation
    active: Option<LayerPair>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pair last applied to the surface
    pub fn active(&self) -> Option<&LayerPair> {
        self.active.as_ref()
    }

    /// Ids currently attached, base first
    pub fn active_ids(&self) -> Vec<&str> {
        self.active.iter().flat_map(|pair| pair.ids()).collect()
    }

    /// Detaches every previously active layer, then attaches every layer of
    /// `layers` in order.
    ///
    /// Unknown ids are recorded in the active pair but never reach the
    /// surface.
    pub fn reconcile(&mut self, view: &mut dyn MapView, registry: &LayerRegistry, layers: LayerPair) {
        if let Some(previous) = self.active.take() {
            for id in previous.ids() {
                if let Some(handle) = registry.get(id) {
                    view.remove_layer(&handle);
                }
            }
        }

        for id in layers.ids() {
            match registry.get(id) {
                Some(handle) => view.add_layer(&handle),
                None => log::warn!("unknown layer '{}', not attached", id),
            }
        }

        log::debug!("active layers: {:?}", layers);
        self.active = Some(layers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{geo::Point, view::HeadlessView};

    fn pairs() -> Vec<LayerPair> {
        vec![
            LayerPair::default(),
            LayerPair::base("outdoors"),
            LayerPair::base("satellite"),
            LayerPair::base("outdoors").with_overlay("trails"),
            LayerPair::base("satellite").with_overlay("trails"),
            LayerPair::base("satellite").with_overlay("hillshade"),
            LayerPair::new(None, Some("trails".into())),
        ]
    }

    #[test]
    fn test_reconcile_attaches_exactly_the_new_set() {
        let registry = LayerRegistry::builtin();
        for previous in pairs() {
            for next in pairs() {
                let mut view = HeadlessView::new(Point::new(800.0, 600.0));
                let mut manager = LayerManager::new();
                manager.reconcile(&mut view, &registry, previous.clone());
                manager.reconcile(&mut view, &registry, next.clone());

                let expected: Vec<&str> = next.ids().collect();
                assert_eq!(view.layer_ids(), expected, "{:?} -> {:?}", previous, next);
                assert_eq!(manager.active(), Some(&next));
            }
        }
    }

    #[test]
    fn test_unknown_id_is_recorded_but_not_attached() {
        let registry = LayerRegistry::builtin();
        let mut view = HeadlessView::new(Point::new(800.0, 600.0));
        let mut manager = LayerManager::new();

        manager.reconcile(
            &mut view,
            &registry,
            LayerPair::base("nope").with_overlay("trails"),
        );

        assert_eq!(view.layer_ids(), vec!["trails"]);
        assert_eq!(manager.active_ids(), vec!["nope", "trails"]);
    }

    #[test]
    fn test_reapplying_same_pair_is_stable() {
        let registry = LayerRegistry::builtin();
        let mut view = HeadlessView::new(Point::new(800.0, 600.0));
        let mut manager = LayerManager::new();
        let pair = LayerPair::base("outdoors").with_overlay("trails");

        manager.reconcile(&mut view, &registry, pair.clone());
        manager.reconcile(&mut view, &registry, pair);

        assert_eq!(view.layer_ids(), vec!["outdoors", "trails"]);
    }
}
