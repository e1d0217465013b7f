pub mod controls;
pub mod select;

pub use controls::{ButtonHandler, ButtonId, Control, ControlButton, Position};
pub use select::SelectGroup;
