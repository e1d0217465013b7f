//! The map surface seam.
//!
//! The controller drives whatever implements [`MapView`]: a browser-backed
//! surface, a native widget or the [`HeadlessView`] used by the binary and the
//! tests. Surfaces never call back into the controller; they queue
//! [`MapEvent`]s that the controller drains with [`MapView::take_events`].

use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    input::events::MapEvent,
    layers::registry::LayerHandle,
    traits::AsAny,
    ui::controls::{ButtonId, Control, ControlButton},
};
use std::collections::{BTreeMap, VecDeque};

/// Identifier of a marker placed through the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub(crate) u64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerOptions {
    pub title: Option<String>,
    pub class_name: Option<String>,
    pub draggable: bool,
}

impl MarkerOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Operations the controller needs from a map surface
pub trait MapView: AsAny + Send {
    fn set_view(&mut self, center: LatLng, zoom: f64);

    fn fit_bounds(&mut self, bounds: &LatLngBounds);

    fn zoom(&self) -> f64;

    fn center(&self) -> LatLng;

    /// Currently visible region
    fn bounds(&self) -> LatLngBounds;

    /// Attaching an already attached layer is a no-op
    fn add_layer(&mut self, layer: &LayerHandle);

    /// Detaching a layer that is not attached is a no-op
    fn remove_layer(&mut self, layer: &LayerHandle);

    fn add_control(&mut self, control: Control);

    /// Gives the surface keyboard focus
    fn focus(&mut self);

    fn add_marker(&mut self, id: MarkerId, position: LatLng, options: &MarkerOptions);

    fn remove_marker(&mut self, id: MarkerId);

    /// Drains the events queued since the last call
    fn take_events(&mut self) -> Vec<MapEvent>;
}

/// A surface with no rendering: records what is attached and queues the
/// events a real surface would fire.
#[derive(Debug, Clone)]
pub struct HeadlessView {
    viewport: Viewport,
    layers: Vec<LayerHandle>,
    controls: Vec<Control>,
    markers: BTreeMap<MarkerId, (LatLng, MarkerOptions)>,
    focused: bool,
    events: VecDeque<MapEvent>,
}

impl Default for HeadlessView {
    fn default() -> Self {
        Self::new(Point::new(800.0, 600.0))
    }
}

impl HeadlessView {
    pub fn new(size: Point) -> Self {
        Self {
            viewport: Viewport::new(LatLng::new(0.0, 0.0), 0.0, size),
            layers: Vec::new(),
            controls: Vec::new(),
            markers: BTreeMap::new(),
            focused: false,
            events: VecDeque::new(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Attached layer ids in attach order
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.id.as_str()).collect()
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ControlButton> {
        self.controls.iter().filter_map(|control| match control {
            Control::Button(button) => Some(button),
            _ => None,
        })
    }

    pub fn has_zoom_control(&self) -> bool {
        self.controls
            .iter()
            .any(|control| matches!(control, Control::Zoom { .. }))
    }

    pub fn has_scale_control(&self) -> bool {
        self.controls
            .iter()
            .any(|control| matches!(control, Control::Scale { .. }))
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerId, &(LatLng, MarkerOptions))> {
        self.markers.iter()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Number of events waiting to be drained
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Simulates a drag that ends at `center`
    pub fn pan_to(&mut self, center: LatLng) {
        self.viewport.set_center(center);
        self.events.push_back(MapEvent::MoveEnd {
            center: self.viewport.center,
        });
    }

    /// Simulates a zoom gesture
    pub fn zoom_to(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
        self.events.push_back(MapEvent::ZoomEnd {
            zoom: self.viewport.zoom,
        });
        self.events.push_back(MapEvent::MoveEnd {
            center: self.viewport.center,
        });
    }

    /// Simulates a click on a control button; returns false for unknown ids
    pub fn click_control(&mut self, id: ButtonId) -> bool {
        let Some(button) = self.buttons().find(|button| button.id == id) else {
            return false;
        };
        let stops_propagation = button.stops_propagation;

        self.events.push_back(MapEvent::ControlClick { button: id });
        if !stops_propagation {
            self.events.push_back(MapEvent::Click {
                lat_lng: self.viewport.center,
            });
        }
        true
    }

    fn moved(&mut self, previous_zoom: f64) {
        if self.viewport.zoom != previous_zoom {
            self.events.push_back(MapEvent::ZoomEnd {
                zoom: self.viewport.zoom,
            });
        }
        self.events.push_back(MapEvent::MoveEnd {
            center: self.viewport.center,
        });
    }
}

impl MapView for HeadlessView {
    fn set_view(&mut self, center: LatLng, zoom: f64) {
        let previous_zoom = self.viewport.zoom;
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        self.moved(previous_zoom);
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let previous_zoom = self.viewport.zoom;
        self.viewport.fit_bounds(bounds, None);
        self.moved(previous_zoom);
    }

    fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    fn center(&self) -> LatLng {
        self.viewport.center
    }

    fn bounds(&self) -> LatLngBounds {
        self.viewport.bounds()
    }

    fn add_layer(&mut self, layer: &LayerHandle) {
        if self.has_layer(&layer.id) {
            return;
        }
        self.layers.push(LayerHandle::clone(layer));
        self.events.push_back(MapEvent::LayerAdd {
            layer_id: layer.id.clone(),
        });
    }

    fn remove_layer(&mut self, layer: &LayerHandle) {
        let before = self.layers.len();
        self.layers.retain(|attached| attached.id != layer.id);
        if self.layers.len() != before {
            self.events.push_back(MapEvent::LayerRemove {
                layer_id: layer.id.clone(),
            });
        }
    }

    fn add_control(&mut self, control: Control) {
        self.controls.push(control);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn add_marker(&mut self, id: MarkerId, position: LatLng, options: &MarkerOptions) {
        self.markers.insert(id, (position, options.clone()));
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn take_events(&mut self) -> Vec<MapEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layers::registry::LayerRegistry,
        ui::controls::{ControlButton, Position},
    };

    #[test]
    fn test_layer_events() {
        let registry = LayerRegistry::builtin();
        let outdoors = registry.get("outdoors").unwrap();
        let mut view = HeadlessView::default();

        view.add_layer(&outdoors);
        view.add_layer(&outdoors);
        view.remove_layer(&outdoors);
        view.remove_layer(&outdoors);

        assert_eq!(
            view.take_events(),
            vec![
                MapEvent::LayerAdd {
                    layer_id: "outdoors".into()
                },
                MapEvent::LayerRemove {
                    layer_id: "outdoors".into()
                },
            ]
        );
        assert_eq!(view.pending_events(), 0);
    }

    #[test]
    fn test_set_view_fires_zoomend_only_on_zoom_change() {
        let mut view = HeadlessView::default();
        view.set_view(LatLng::new(61.0, 8.0), 10.0);
        view.take_events();

        view.set_view(LatLng::new(62.0, 8.0), 10.0);
        let events = view.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MapEvent::MoveEnd { .. }));
    }

    #[test]
    fn test_click_control_propagation() {
        let mut view = HeadlessView::default();
        let mut leaky = ControlButton::new(ButtonId(2), "leaky", Position::TopLeft);
        leaky.stops_propagation = false;
        view.add_control(Control::Button(ControlButton::new(
            ButtonId(1),
            "layers",
            Position::TopRight,
        )));
        view.add_control(Control::Button(leaky));

        assert!(view.click_control(ButtonId(1)));
        assert_eq!(view.take_events().len(), 1);

        assert!(view.click_control(ButtonId(2)));
        assert_eq!(view.take_events().len(), 2);

        assert!(!view.click_control(ButtonId(9)));
    }
}
