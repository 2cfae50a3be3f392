use std::collections::HashMap;
use std::future::Future;

use tokio::sync::OnceCell;

use kom_api::convert::TargetType;
use kom_api::error::PluginError;
use kom_api::value::Value;

/// IPN to primary key, built from one full listing and kept for the lifetime
/// of the table.
///
/// Never refreshed: parts added on the server after the first listing are
/// not found by IPN until the table is reconnected.
#[derive(Debug, Default)]
pub struct AlternateKeyCache {
    map: OnceCell<HashMap<String, String>>,
}

impl AlternateKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_populated(&self) -> bool {
        self.map.initialized()
    }

    /// Populate from a listing that was fetched anyway. Returns `false` if the
    /// cache was already populated, in which case `parts` is ignored.
    pub fn fill(&self, parts: &[Value]) -> bool {
        self.map.set(index(parts)).is_ok()
    }

    /// Primary key for `ipn`. On first use the listing is fetched with
    /// `listing`; concurrent first lookups wait for the same fetch.
    pub async fn lookup<F, Fut>(&self, ipn: &str, listing: F) -> Result<Option<String>, PluginError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Value>, PluginError>>,
    {
        let map = self
            .map
            .get_or_try_init(|| async {
                let parts = listing().await?;
                tracing::debug!(parts = parts.len(), "building ipn cache");
                Ok::<_, PluginError>(index(&parts))
            })
            .await?;
        Ok(map.get(ipn).cloned())
    }
}

/// Parts without a textual IPN or without a primary key are not indexed.
fn index(parts: &[Value]) -> HashMap<String, String> {
    parts
        .iter()
        .filter_map(|part| {
            let ipn = part.get("IPN")?.as_str()?;
            let pk = TargetType::String.coerce(part.get("pk")?).ok()?;
            Some((ipn.to_string(), pk.as_str()?.to_string()))
        })
        .collect()
}
