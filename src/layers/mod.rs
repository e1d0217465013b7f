pub mod manager;
pub mod registry;

pub use manager::LayerManager;
pub use registry::{LayerCategory, LayerConfig, LayerHandle, LayerRegistry};
