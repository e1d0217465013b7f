use crate::{
    constants::MAP_BUTTON_CLASS, core::controller::MapContext, plugins::base::PluginId, Result,
};
use std::fmt;

/// Corner of the surface a control is docked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Default for Position {
    fn default() -> Self {
        Position::TopRight
    }
}

/// Identifier of a control button created through the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId(pub(crate) u32);

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button#{}", self.0)
    }
}

/// A clickable control as the surface sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ControlButton {
    pub id: ButtonId,
    pub class_name: String,
    pub position: Position,
    /// Clicks on the button never reach the map (no pan, no map click)
    pub stops_propagation: bool,
}

impl ControlButton {
    pub(crate) fn new(id: ButtonId, class_name: &str, position: Position) -> Self {
        Self {
            id,
            class_name: format!("{} {}", MAP_BUTTON_CLASS, class_name),
            position,
            stops_propagation: true,
        }
    }
}

/// Controls the controller attaches to the surface
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Scale { imperial: bool },
    Zoom { position: Position },
    Button(ControlButton),
}

pub type ButtonCallback = Box<dyn FnMut(&mut MapContext<'_>) -> Result<()> + Send>;

/// What runs when a button is clicked, scoped to whoever created it
pub enum ButtonHandler {
    /// Routed to the owning plugin's `on_command`
    Plugin { plugin: PluginId, command: String },
    /// Runs against the controller with no plugin attached
    Callback(ButtonCallback),
}

impl fmt::Debug for ButtonHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonHandler::Plugin { plugin, command } => f
                .debug_struct("Plugin")
                .field("plugin", plugin)
                .field("command", command)
                .finish(),
            ButtonHandler::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_class_is_prefixed() {
        let button = ControlButton::new(ButtonId(3), "layers", Position::TopRight);
        assert_eq!(button.class_name, "map-button layers");
        assert!(button.stops_propagation);
        assert_eq!(button.id.to_string(), "button#3");
    }
}
