//! Static catalog of the layers a session can show.
//!
//! The registry is loaded once and never mutated. Every other component
//! queries it by id or by category; registry order is significant (it is the
//! order selection controls list layers in and the order the recommendation
//! heuristic scans them in).

use crate::{
    core::geo::{LatLng, LatLngBounds},
    prelude::{Arc, HashMap},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grouping of layers that serve the same purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerCategory {
    Hiking,
    Satellite,
    Map,
    Overlay,
}

impl LayerCategory {
    /// Categories whose layers are used as the base layer
    pub const BASE: [LayerCategory; 3] = [
        LayerCategory::Hiking,
        LayerCategory::Satellite,
        LayerCategory::Map,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerCategory::Hiking => "hiking",
            LayerCategory::Satellite => "satellite",
            LayerCategory::Map => "map",
            LayerCategory::Overlay => "overlay",
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, LayerCategory::Overlay)
    }
}

impl Default for LayerCategory {
    fn default() -> Self {
        LayerCategory::Hiking
    }
}

impl fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerCategory {
    type Err = MapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hiking" => Ok(LayerCategory::Hiking),
            "satellite" => Ok(LayerCategory::Satellite),
            "map" => Ok(LayerCategory::Map),
            "overlay" => Ok(LayerCategory::Overlay),
            other => Err(MapError::Layer(format!("unknown layer category '{}'", other))),
        }
    }
}

/// One renderable tile source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    #[serde(rename = "mapType")]
    pub category: LayerCategory,
    pub title: String,
    /// Region the layer is valid in; `None` means global
    #[serde(default, rename = "bounds", skip_serializing_if = "Option::is_none")]
    pub coverage: Option<LatLngBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl LayerConfig {
    pub fn new(id: impl Into<String>, category: LayerCategory, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category,
            title: title.into(),
            coverage: None,
            url: None,
            attribution: None,
        }
    }

    pub fn with_coverage(mut self, coverage: LatLngBounds) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn is_global(&self) -> bool {
        self.coverage.is_none()
    }

    /// True if the layer has a coverage region and it contains `point`
    pub fn coverage_contains(&self, point: &LatLng) -> bool {
        self.coverage
            .as_ref()
            .is_some_and(|coverage| coverage.contains(point))
    }

    /// True if the layer is usable everywhere inside `view`
    pub fn covers_view(&self, view: &LatLngBounds) -> bool {
        self.coverage
            .as_ref()
            .map_or(true, |coverage| coverage.contains_bounds(view))
    }
}

/// What the surface receives when a layer is attached or detached
pub type LayerHandle = Arc<LayerConfig>;

/// Ordered, read-only layer catalog
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<LayerHandle>,
    index: HashMap<String, usize>,
}

impl LayerRegistry {
    /// Builds a registry, rejecting duplicate ids
    pub fn new(layers: Vec<LayerConfig>) -> Result<Self> {
        let mut registry = Self::default();
        for layer in layers {
            if registry.index.contains_key(&layer.id) {
                return Err(MapError::Layer(format!("duplicate layer id '{}'", layer.id)).into());
            }
            registry.push(layer);
        }
        Ok(registry)
    }

    /// Parses a JSON array of layer configs
    pub fn from_json(json: &str) -> Result<Self> {
        let layers: Vec<LayerConfig> = serde_json::from_str(json).map_err(MapError::from)?;
        Self::new(layers)
    }

    /// The catalog compiled into the viewer
    pub fn builtin() -> Self {
        let norway = LatLngBounds::from_coords(57.9, 4.0, 71.2, 31.2);
        let sweden = LatLngBounds::from_coords(55.3, 10.9, 69.1, 24.2);
        let europe = crate::constants::europe_bounds();

        let mut registry = Self::default();
        for layer in [
            LayerConfig::new("norway_topo", LayerCategory::Hiking, "Norway topo")
                .with_coverage(norway.clone())
                .with_url("https://cache.kartverket.no/v1/wmts/1.0.0/topo/default/webmercator/{z}/{y}/{x}.png")
                .with_attribution("© Kartverket"),
            LayerConfig::new("sweden_topo", LayerCategory::Hiking, "Sweden topo")
                .with_coverage(sweden)
                .with_attribution("© Lantmäteriet"),
            LayerConfig::new(crate::constants::DEFAULT_BASE_LAYER, LayerCategory::Hiking, "Outdoors")
                .with_url("https://api.mapbox.com/styles/v1/mapbox/outdoors-v12/tiles/{z}/{x}/{y}")
                .with_attribution("© Mapbox © OpenStreetMap"),
            LayerConfig::new("norway_aerial", LayerCategory::Satellite, "Norway aerial")
                .with_coverage(norway)
                .with_attribution("© Norge i bilder"),
            LayerConfig::new("satellite", LayerCategory::Satellite, "Satellite")
                .with_url("https://api.mapbox.com/styles/v1/mapbox/satellite-v9/tiles/{z}/{x}/{y}")
                .with_attribution("© Mapbox © Maxar"),
            LayerConfig::new("mapboxstreets", LayerCategory::Map, "Streets")
                .with_url("https://api.mapbox.com/styles/v1/mapbox/streets-v12/tiles/{z}/{x}/{y}")
                .with_attribution("© Mapbox © OpenStreetMap"),
            LayerConfig::new("trails", LayerCategory::Overlay, "Hiking trails")
                .with_url("https://tile.waymarkedtrails.org/hiking/{z}/{x}/{y}.png")
                .with_attribution("© waymarkedtrails.org"),
            LayerConfig::new("hillshade", LayerCategory::Overlay, "Hillshade")
                .with_coverage(europe)
                .with_attribution("© EU-DEM"),
        ] {
            registry.push(layer);
        }
        registry
    }

    fn push(&mut self, layer: LayerConfig) {
        self.index.insert(layer.id.clone(), self.layers.len());
        self.layers.push(Arc::new(layer));
    }

    /// All layers, or those in `category`, in registry order
    pub fn all_keys(&self, category: Option<LayerCategory>) -> Vec<&LayerConfig> {
        self.layers
            .iter()
            .map(|layer| layer.as_ref())
            .filter(|layer| category.map_or(true, |c| layer.category == c))
            .collect()
    }

    /// The handle the surface attaches for `id`
    pub fn get(&self, id: &str) -> Option<LayerHandle> {
        self.index.get(id).map(|&i| Arc::clone(&self.layers[i]))
    }

    pub fn config(&self, id: &str) -> Option<&LayerConfig> {
        self.index.get(id).map(|&i| self.layers[i].as_ref())
    }

    pub fn map_type_of(&self, id: &str) -> Option<LayerCategory> {
        self.config(id).map(|layer| layer.category)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let registry = LayerRegistry::builtin();
        let hiking: Vec<_> = registry
            .all_keys(Some(LayerCategory::Hiking))
            .into_iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(hiking, vec!["norway_topo", "sweden_topo", "outdoors"]);
        assert_eq!(registry.all_keys(None).len(), registry.len());
    }

    #[test]
    fn test_lookup() {
        let registry = LayerRegistry::builtin();
        assert!(registry.contains("satellite"));
        assert_eq!(registry.map_type_of("trails"), Some(LayerCategory::Overlay));
        assert_eq!(registry.get("satellite").unwrap().title, "Satellite");
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.map_type_of("nope"), None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = LayerRegistry::new(vec![
            LayerConfig::new("a", LayerCategory::Map, "A"),
            LayerConfig::new("a", LayerCategory::Hiking, "Also A"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json() {
        let registry = LayerRegistry::from_json(
            r#"[
                {"id": "topo", "mapType": "hiking", "title": "Topo", "bounds": [[57.9, 4.0], [71.2, 31.2]]},
                {"id": "osm", "mapType": "map", "title": "OSM"}
            ]"#,
        )
        .unwrap();

        let topo = registry.config("topo").unwrap();
        assert!(!topo.is_global());
        assert!(topo.coverage_contains(&LatLng::new(61.0, 9.0)));
        assert!(registry.config("osm").unwrap().is_global());
    }

    #[test]
    fn test_covers_view() {
        let layer = LayerConfig::new("topo", LayerCategory::Hiking, "Topo")
            .with_coverage(LatLngBounds::from_coords(57.9, 4.0, 71.2, 31.2));
        let inside = LatLngBounds::from_coords(60.0, 8.0, 61.0, 10.0);
        let outside = LatLngBounds::from_coords(47.0, 8.0, 48.0, 10.0);

        assert!(layer.covers_view(&inside));
        assert!(!layer.covers_view(&outside));
        assert!(LayerConfig::new("g", LayerCategory::Map, "G").covers_view(&outside));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("satellite".parse::<LayerCategory>().unwrap(), LayerCategory::Satellite);
        assert!("bogus".parse::<LayerCategory>().is_err());
        assert_eq!(LayerCategory::Overlay.to_string(), "overlay");
    }
}
