//! inkplay-plugins: Built-in content plugins for inkplay.

mod clock;
mod color;
mod command;
mod image_file;
pub mod raster;

pub use clock::{draw_clock, ClockPlugin};
pub use color::ColorPlugin;
pub use command::CommandPlugin;
pub use image_file::ImageFilePlugin;

use inkplay_core::PluginRegistry;
use std::sync::Arc;

/// Register all built-in plugins
pub fn register_all(registry: &mut PluginRegistry) {
    registry.register(Arc::new(ColorPlugin::new()));
    registry.register(Arc::new(ClockPlugin::new()));
    registry.register(Arc::new(ImageFilePlugin::new()));
    registry.register(Arc::new(CommandPlugin::new()));
    log::debug!("Registered {} built-in plugins", registry.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all() {
        let mut registry = PluginRegistry::new();
        register_all(&mut registry);
        for id in ["color", "clock", "image_file", "command"] {
            assert!(registry.contains(id), "missing plugin {}", id);
        }
    }
}
