//! Fetching one part together with the secondary objects its columns read.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::task::JoinHandle;

use kom_api::error::PluginError;
use kom_api::value::Value;

use crate::api::InventreeApi;

/// Secondary objects the declared columns read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Secondary {
    pub metadata: bool,
    pub parameters: bool,
}

impl Secondary {
    pub fn any(self) -> bool {
        self.metadata || self.parameters
    }
}

/// A part record and its secondary objects. Secondary objects that were not
/// requested are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub record: Value,
    pub metadata: Value,
    pub parameters: Value,
}

impl Fetched {
    /// Record from a listing, with no secondary objects.
    pub fn record_only(record: Value) -> Self {
        Self {
            record,
            metadata: Value::object(),
            parameters: Value::object(),
        }
    }
}

/// Fetch part `pk` and the secondary objects in `secondary`.
///
/// With no secondary object this is a single request. Otherwise all requests
/// run as separate tasks and the first failure is returned as soon as it
/// happens. Requests still in flight at that point finish in the background
/// and their results are dropped.
pub async fn fetch_part(
    api: Arc<dyn InventreeApi>,
    pk: String,
    secondary: Secondary,
) -> Result<Fetched, PluginError> {
    if !secondary.any() {
        let record = api.part(&pk).await?;
        return Ok(Fetched::record_only(record));
    }

    let base = {
        let (api, pk) = (api.clone(), pk.clone());
        tokio::spawn(async move { api.part(&pk).await })
    };
    let metadata = secondary.metadata.then(|| {
        let (api, pk) = (api.clone(), pk.clone());
        tokio::spawn(async move { api.part_metadata(&pk).await.map(unwrap_metadata) })
    });
    let parameters = secondary.parameters.then(|| {
        let (api, pk) = (api.clone(), pk.clone());
        tokio::spawn(async move { reduce_parameters(api.part_parameters(&pk).await?) })
    });

    let (record, metadata, parameters) = tokio::try_join!(
        join(base),
        join_optional(metadata),
        join_optional(parameters),
    )
    .map_err(|e| e.with_context(format!("part {pk}")))?;

    Ok(Fetched {
        record,
        metadata,
        parameters,
    })
}

async fn join<T>(handle: JoinHandle<Result<T, PluginError>>) -> Result<T, PluginError> {
    handle
        .await
        .map_err(|e| PluginError::adapter(format!("fetch task failed: {e}")))?
}

async fn join_optional(
    handle: Option<JoinHandle<Result<Value, PluginError>>>,
) -> Result<Value, PluginError> {
    match handle {
        Some(handle) => join(handle).await,
        None => Ok(Value::object()),
    }
}

/// The metadata endpoint answers `{"metadata": {...}}`.
pub fn unwrap_metadata(response: Value) -> Value {
    match response {
        Value::Object(mut envelope) if envelope.contains_key("metadata") => {
            match envelope.shift_remove("metadata") {
                Some(Value::Null) | None => Value::object(),
                Some(metadata) => metadata,
            }
        }
        other => other,
    }
}

/// Parameter entries reduced to `template name -> data`. A later entry with the
/// same template name replaces an earlier one.
pub fn reduce_parameters(entries: Vec<Value>) -> Result<Value, PluginError> {
    let mut reduced = IndexMap::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let name = entry
            .lookup(&["template_detail", "name"])
            .present()
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PluginError::decode(format!("parameter entry {i} has no template name"))
            })?
            .to_string();
        let data = entry.get("data").cloned().unwrap_or_default();
        reduced.insert(name, data);
    }
    Ok(Value::Object(reduced))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn metadata_envelope_is_removed() {
        let response = Value::from(json!({"metadata": {"kicad": {"symbols": "Device:R"}}}));
        assert_eq!(
            unwrap_metadata(response),
            Value::from(json!({"kicad": {"symbols": "Device:R"}}))
        );
        assert_eq!(unwrap_metadata(Value::from(json!({"metadata": null}))), Value::object());
        assert_eq!(
            unwrap_metadata(Value::from(json!({"kicad": {}}))),
            Value::from(json!({"kicad": {}}))
        );
    }

    #[test]
    fn parameters_are_keyed_by_template_name() {
        let entries = vec![
            Value::from(json!({"template_detail": {"name": "Resistance"}, "data": "10k"})),
            Value::from(json!({"template_detail": {"name": "Tolerance"}, "data": "1%"})),
        ];
        assert_eq!(
            reduce_parameters(entries).unwrap(),
            Value::from(json!({"Resistance": "10k", "Tolerance": "1%"}))
        );
    }

    #[test]
    fn parameter_without_template_name_is_rejected() {
        let entries = vec![Value::from(json!({"template_detail": null, "data": "10k"}))];
        let err = reduce_parameters(entries).unwrap_err();
        assert_eq!(err.kind, kom_api::error::ErrorKind::Decode);
    }
}
