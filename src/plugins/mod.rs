pub mod base;
pub mod recommend;
pub mod settings;

pub use base::{BasePlugin, BringUpContext, Plugin, PluginFactory, PluginHooks, PluginId};
