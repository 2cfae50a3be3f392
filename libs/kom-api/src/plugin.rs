use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use indexmap::IndexMap;

use crate::config::PluginArguments;
use crate::error::PluginError;
use crate::settings::Settings;
use crate::value::Value;

/// One row: column name → value. Every declared column is present.
pub type Part = IndexMap<String, Value>;

pub type Parts = Vec<Part>;

/// Equality filter pushed down by the host (`column = value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

/// Data source plugin.
///
/// The adapter doesn't enumerate or know concrete implementations.
/// For the adapter, a data source is just this trait.
pub trait KomPlugin: Send + Sync {
    /// Configure from settings and module arguments. Called once, before the
    /// column list is read.
    ///
    /// The returned future may borrow the settings store and is therefore not
    /// required to be `Send`.
    fn init<'a>(
        &'a mut self,
        settings: &'a dyn Settings,
        args: &'a PluginArguments,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + 'a>>;

    /// Declared columns, in display order.
    fn column_names(&self) -> Vec<String>;

    /// Whether an equality filter on `column` can be answered without a full
    /// listing.
    fn can_filter(&self, column: &str) -> bool;

    /// Rows matching `filter`, or every row in the configured scope.
    fn parts<'a>(
        &'a self,
        filter: Option<&'a Filter>,
    ) -> Pin<Box<dyn Future<Output = Result<Parts, PluginError>> + Send + 'a>>;
}

type Constructor = Box<dyn Fn() -> Box<dyn KomPlugin> + Send + Sync>;

/// Named plugin constructors.
///
/// Built once at startup and shared read-only with every table.
#[derive(Default)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn KomPlugin> + Send + Sync + 'static,
    {
        self.register(name, constructor);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn KomPlugin> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Fresh, uninitialized plugin instance.
    pub fn create(&self, name: &str) -> Result<Box<dyn KomPlugin>, PluginError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| {
                PluginError::config(format!(
                    "unknown plugin `{name}` (available: {})",
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}
