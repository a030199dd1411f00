//! Registry of plugin implementations

use crate::plugin::{Plugin, PluginMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, type-erased plugin
pub type SharedPlugin = Arc<dyn Plugin>;

/// Registry mapping plugin identifiers to implementations
///
/// Built once at startup and handed to the scheduler. A lookup miss is an
/// ordinary condition (the instance is skipped), not a crash.
pub struct PluginRegistry {
    plugins: HashMap<String, SharedPlugin>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin under its metadata id
    pub fn register(&mut self, plugin: SharedPlugin) {
        let id = plugin.metadata().id.clone();
        if self.plugins.insert(id.clone(), plugin).is_some() {
            log::warn!("Plugin '{}' registered twice, keeping the latest", id);
        }
    }

    /// Look up a plugin by id
    pub fn resolve(&self, id: &str) -> Option<SharedPlugin> {
        self.plugins.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// Metadata of all registered plugins, sorted by id
    pub fn list(&self) -> Vec<PluginMetadata> {
        let mut list: Vec<PluginMetadata> = self
            .plugins
            .values()
            .map(|p| p.metadata().clone())
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
