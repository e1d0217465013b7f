//! The persisted state record and the stores that keep it across sessions.
//!
//! The record is the single source of truth for the *desired* map
//! configuration. It is read and written by the controller and by plugins,
//! always through a [`StateStore`], never through a private copy.

use crate::{
    core::geo::{LatLng, LatLngBounds},
    layers::registry::LayerCategory,
    MapError, Result,
};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordered `[base, overlay]` pair; both slots optional.
///
/// Serialized as a JSON array with the trailing absent slot omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LayerPair {
    pub base: Option<String>,
    pub overlay: Option<String>,
}

impl LayerPair {
    pub fn new(base: Option<String>, overlay: Option<String>) -> Self {
        Self { base, overlay }
    }

    /// A pair with a base layer and no overlay
    pub fn base(id: impl Into<String>) -> Self {
        Self::new(Some(id.into()), None)
    }

    pub fn with_overlay(mut self, id: impl Into<String>) -> Self {
        self.overlay = Some(id.into());
        self
    }

    /// Present ids, base first
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.base.as_deref().into_iter().chain(self.overlay.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.overlay.is_none()
    }
}

impl Serialize for LayerPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if self.overlay.is_some() {
            2
        } else {
            usize::from(self.base.is_some())
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        if len > 0 {
            seq.serialize_element(&self.base)?;
        }
        if len > 1 {
            seq.serialize_element(&self.overlay)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for LayerPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let slots: Vec<Option<String>> = Vec::deserialize(deserializer)?;
        if slots.len() > 2 {
            return Err(de::Error::invalid_length(slots.len(), &"at most two layer ids"));
        }
        // Empty strings count as absent
        let mut slots = slots.into_iter().map(|slot| slot.filter(|id| !id.is_empty()));
        Ok(Self {
            base: slots.next().flatten(),
            overlay: slots.next().flatten(),
        })
    }
}

/// The persisted configuration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<LatLngBounds>,
    /// Last chosen base layer per category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_layers: Option<BTreeMap<LayerCategory, String>>,
    /// Plugin-private fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl State {
    pub fn with_layers(mut self, layers: LayerPair) -> Self {
        self.layers = Some(layers);
        self
    }

    pub fn with_view(mut self, center: LatLng, zoom: f64) -> Self {
        self.center = Some(center);
        self.zoom = Some(zoom);
        self
    }

    pub fn with_bounds(mut self, bounds: LatLngBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overwrites every field present in `patch`; absent fields are untouched
    pub fn merge(&mut self, patch: State) {
        if patch.layers.is_some() {
            self.layers = patch.layers;
        }
        if patch.center.is_some() {
            self.center = patch.center;
        }
        if patch.zoom.is_some() {
            self.zoom = patch.zoom;
        }
        if patch.bounds.is_some() {
            self.bounds = patch.bounds;
        }
        if patch.default_layers.is_some() {
            self.default_layers = patch.default_layers;
        }
        self.extra.extend(patch.extra);
    }

    /// The fields of `defaults` whose key is absent here
    pub fn missing_from(&self, defaults: &State) -> State {
        State {
            layers: self.layers.is_none().then(|| defaults.layers.clone()).flatten(),
            center: self.center.is_none().then_some(defaults.center).flatten(),
            zoom: self.zoom.is_none().then_some(defaults.zoom).flatten(),
            bounds: self.bounds.is_none().then(|| defaults.bounds.clone()).flatten(),
            default_layers: self
                .default_layers
                .is_none()
                .then(|| defaults.default_layers.clone())
                .flatten(),
            extra: defaults
                .extra
                .iter()
                .filter(|(key, _)| !self.extra.contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// JSON value of one field, `None` if absent
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut fields)) => fields.remove(key),
            _ => None,
        }
    }

    /// Writes one field by name; `Value::Null` clears it
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        let Value::Object(mut fields) = serde_json::to_value(&*self).map_err(MapError::from)? else {
            return Err(MapError::State("state record is not an object".to_string()).into());
        };
        if value.is_null() {
            fields.remove(key);
        } else {
            fields.insert(key.to_string(), value);
        }
        *self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| MapError::State(format!("invalid value for '{}': {}", key, e)))?;
        Ok(())
    }
}

/// Persistence contract: read the record, merge patches, flush
pub trait StateStore: Send {
    fn state(&self) -> &State;

    /// Merges the present fields of `patch` into the record
    fn set(&mut self, patch: State);

    fn set_value(&mut self, key: &str, value: Value) -> Result<()>;

    fn save(&mut self) -> Result<()>;

    fn get(&self, key: &str) -> Option<Value> {
        self.state().get(key)
    }
}

/// Keeps the record in memory; remembers what was last saved
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: State,
    saved: Option<State>,
    save_count: usize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: State) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<&State> {
        self.saved.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl StateStore for MemoryStateStore {
    fn state(&self) -> &State {
        &self.state
    }

    fn set(&mut self, patch: State) {
        self.state.merge(patch);
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.state.set_value(key, value)
    }

    fn save(&mut self) -> Result<()> {
        self.saved = Some(self.state.clone());
        self.save_count += 1;
        Ok(())
    }
}

/// Keeps the record in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
    state: State,
}

impl JsonFileStateStore {
    /// Loads `path`; a missing or unreadable record starts a fresh session
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("ignoring corrupt state file {}: {}", path.display(), e);
                    State::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no state file at {}, starting empty", path.display());
                State::default()
            }
            Err(e) => return Err(MapError::from(e).into()),
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStateStore {
    fn state(&self) -> &State {
        &self.state
    }

    fn set(&mut self, patch: State) {
        self.state.merge(patch);
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.state.set_value(key, value)
    }

    fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(MapError::from)?;
        }
        let json = serde_json::to_string_pretty(&self.state).map_err(MapError::from)?;
        std::fs::write(&self.path, json).map_err(MapError::from)?;
        log::debug!("saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_layer_pair_encoding() {
        assert_eq!(
            serde_json::to_value(LayerPair::base("outdoors")).unwrap(),
            json!(["outdoors"])
        );
        assert_eq!(
            serde_json::to_value(LayerPair::base("outdoors").with_overlay("trails")).unwrap(),
            json!(["outdoors", "trails"])
        );
        assert_eq!(
            serde_json::to_value(LayerPair::new(None, Some("trails".into()))).unwrap(),
            json!([null, "trails"])
        );
        assert_eq!(serde_json::to_value(LayerPair::default()).unwrap(), json!([]));
    }

    #[test]
    fn test_layer_pair_decoding() {
        let pair: LayerPair = serde_json::from_value(json!(["", "trails"])).unwrap();
        assert_eq!(pair, LayerPair::new(None, Some("trails".into())));
        assert_eq!(pair.ids().collect::<Vec<_>>(), vec!["trails"]);

        assert!(serde_json::from_value::<LayerPair>(json!(["a", "b", "c"])).is_err());
    }

    #[test]
    fn test_state_field_names() {
        let mut defaults = BTreeMap::new();
        defaults.insert(LayerCategory::Satellite, "satellite".to_string());
        let state = State {
            default_layers: Some(defaults),
            ..State::default()
        }
        .with_view(LatLng::new(61.0, 8.0), 9.0)
        .with_value("routingService", json!("mapbox"));

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "center": {"lat": 61.0, "lng": 8.0},
                "zoom": 9.0,
                "defaultLayers": {"satellite": "satellite"},
                "routingService": "mapbox"
            })
        );
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let mut state = State::default()
            .with_layers(LayerPair::base("outdoors"))
            .with_view(LatLng::new(61.0, 8.0), 9.0);
        state.merge(State {
            zoom: Some(12.0),
            ..State::default()
        });

        assert_eq!(state.zoom, Some(12.0));
        assert_eq!(state.center, Some(LatLng::new(61.0, 8.0)));
        assert_eq!(state.layers, Some(LayerPair::base("outdoors")));
    }

    #[test]
    fn test_missing_from_never_overwrites() {
        let defaults = State::default()
            .with_layers(LayerPair::base("outdoors"))
            .with_bounds(LatLngBounds::from_coords(35.0, -15.0, 65.0, 35.0))
            .with_value("routingService", json!("mapbox"));
        let stored = State::default()
            .with_layers(LayerPair::base("satellite"))
            .with_value("routingService", json!("osrm"));

        let patch = stored.missing_from(&defaults);
        assert_eq!(patch.layers, None);
        assert_eq!(patch.bounds, defaults.bounds);
        assert!(patch.extra.is_empty());
    }

    #[test]
    fn test_get_and_set_value() {
        let mut state = State::default();
        state.set_value("layers", json!(["satellite", "trails"])).unwrap();
        state.set_value("lastSearch", json!("Besseggen")).unwrap();

        assert_eq!(
            state.layers,
            Some(LayerPair::base("satellite").with_overlay("trails"))
        );
        assert_eq!(state.get("lastSearch"), Some(json!("Besseggen")));
        assert_eq!(state.get("zoom"), None);

        state.set_value("layers", Value::Null).unwrap();
        assert_eq!(state.layers, None);

        assert!(state.set_value("zoom", json!("deep")).is_err());
    }

    #[test]
    fn test_memory_store_tracks_saves() {
        let mut store = MemoryStateStore::new();
        store.set(State::default().with_layers(LayerPair::base("outdoors")));
        assert!(store.saved().is_none());

        store.save().unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.saved().unwrap().layers, Some(LayerPair::base("outdoors")));
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = JsonFileStateStore::open(&path).unwrap();
        assert_eq!(store.state(), &State::default());

        store.set(State::default().with_view(LatLng::new(61.5, 8.3), 11.0));
        store.save().unwrap();

        let reopened = JsonFileStateStore::open(&path).unwrap();
        assert_eq!(reopened.state().zoom, Some(11.0));
        assert_eq!(reopened.state().center, Some(LatLng::new(61.5, 8.3)));
    }

    #[test]
    fn test_json_file_store_ignores_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStateStore::open(&path).unwrap();
        assert_eq!(store.state(), &State::default());
    }
}
