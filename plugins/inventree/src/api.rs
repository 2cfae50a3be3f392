use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use kom_api::error::PluginError;
use kom_api::value::Value;

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PluginError>> + Send + 'a>>;

/// Entry of `/api/part/category/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub pk: i64,
    pub pathstring: String,
}

/// Read-only part endpoints of an InvenTree server.
///
/// `pk` is the primary key in its textual form, as it appears in URLs.
pub trait InventreeApi: Send + Sync {
    fn categories(&self) -> ApiFuture<'_, Vec<Category>>;

    /// Parts directly in `category`.
    fn parts_in_category(&self, category: i64) -> ApiFuture<'_, Vec<Value>>;

    fn part<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Value>;

    /// Metadata of one part, as returned by the server (still wrapped in its
    /// `metadata` envelope).
    fn part_metadata<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Value>;

    /// Raw parameter entries of one part.
    fn part_parameters<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Vec<Value>>;
}
