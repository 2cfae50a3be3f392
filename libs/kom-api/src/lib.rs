pub mod config;
pub mod convert;
pub mod error;
pub mod mapping;
pub mod plugin;
pub mod settings;
pub mod value;

pub use config::PluginArguments;
pub use error::{ErrorKind, PluginError};
pub use plugin::{Filter, KomPlugin, Part, Parts, PluginRegistry};
pub use settings::Settings;
pub use value::Value;
