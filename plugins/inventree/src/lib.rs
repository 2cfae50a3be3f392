//! InvenTree data source for the `kom` virtual table.

pub mod alternate;
pub mod api;
pub mod auth;
pub mod category;
pub mod client;
pub mod error;
pub mod fetch;
pub mod plugin;

pub use api::{Category, InventreeApi};
pub use client::HttpInventree;
pub use error::InventreeError;
pub use plugin::{InventreePlugin, PLUGIN_NAME};

use kom_api::plugin::PluginRegistry;

/// Register the plugin under [`PLUGIN_NAME`].
pub fn register(registry: &mut PluginRegistry) {
    registry.register(PLUGIN_NAME, || Box::new(InventreePlugin::new()));
}
