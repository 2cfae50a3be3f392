use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kom_api::config::PluginArguments;
use kom_api::convert::TargetType;
use kom_api::error::PluginError;
use kom_api::mapping::{FieldMapping, FieldSet, Origin, parse_fields};
use kom_api::plugin::{Filter, KomPlugin, Part, Parts};
use kom_api::settings::Settings;
use kom_api::value::Value;

use crate::alternate::AlternateKeyCache;
use crate::api::InventreeApi;
use crate::auth;
use crate::category::CategoryIndex;
use crate::client::HttpInventree;
use crate::fetch::{Fetched, Secondary, fetch_part};

/// Registry name of this plugin.
pub const PLUGIN_NAME: &str = "inventree";

/// InvenTree parts as table rows.
///
/// Recognized arguments: `categories` (required, comma separated category
/// paths), `fields`, `default_symbol`, `default_footprint`.
#[derive(Default)]
pub struct InventreePlugin {
    state: Option<Configured>,
}

struct Configured {
    api: Arc<dyn InventreeApi>,
    categories: Vec<i64>,
    fields: FieldSet,
    secondary: Secondary,
    ipn_cache: AlternateKeyCache,
}

impl InventreePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure against an already authorized API.
    pub async fn configure(
        &mut self,
        api: Arc<dyn InventreeApi>,
        args: &PluginArguments,
    ) -> Result<(), PluginError> {
        let categories = args.require("categories")?;

        let mut fields = builtin_fields(args);
        if let Some(spec) = args.get("fields") {
            fields.apply(parse_fields(spec)?);
        }
        let secondary = Secondary {
            metadata: fields.uses(Origin::Metadata),
            parameters: fields.uses(Origin::Parameters),
        };

        let index = CategoryIndex::new(api.categories().await?);
        let categories = index.resolve(categories);
        tracing::info!(
            known = index.len(),
            selected = categories.len(),
            columns = fields.len(),
            "inventree plugin configured"
        );

        self.state = Some(Configured {
            api,
            categories,
            fields,
            secondary,
            ipn_cache: AlternateKeyCache::new(),
        });
        Ok(())
    }

    fn configured(&self) -> Result<&Configured, PluginError> {
        self.state
            .as_ref()
            .ok_or_else(|| PluginError::adapter("inventree plugin used before init"))
    }
}

/// Columns every table has, before user `fields`.
fn builtin_fields(args: &PluginArguments) -> FieldSet {
    let text_arg = |name: &str| args.get(name).map(Value::from).unwrap_or_default();

    let mut fields = FieldSet::new();
    fields.add("PK", FieldMapping::new("pk").with_type(TargetType::String));
    fields.add("IPN", FieldMapping::new("IPN"));
    fields.add("Name", FieldMapping::new("name"));
    fields.add("Keywords", FieldMapping::new("keywords"));
    fields.add("Description", FieldMapping::new("description"));
    fields.add(
        "Symbols",
        FieldMapping::new("metadata.kicad.symbols").with_default(text_arg("default_symbol")),
    );
    fields.add(
        "Footprints",
        FieldMapping::new("metadata.kicad.footprints").with_default(text_arg("default_footprint")),
    );
    fields
}

/// Key value from a pushed-down constraint, in URL form. `NULL` matches nothing.
fn key_text(value: &Value) -> Result<Option<String>, PluginError> {
    if value.is_null() {
        return Ok(None);
    }
    let text = TargetType::String.coerce(value)?;
    Ok(text.as_str().map(str::to_string))
}

impl Configured {
    /// Every part in the selected categories, one request per category.
    async fn listing(&self) -> Result<Vec<Value>, PluginError> {
        let mut parts = Vec::new();
        for &category in &self.categories {
            let batch = self
                .api
                .parts_in_category(category)
                .await
                .map_err(|e| e.with_context(format!("category {category}")))?;
            parts.extend(batch);
        }
        Ok(parts)
    }

    async fn all_parts(&self) -> Result<Parts, PluginError> {
        let listing = self.listing().await?;
        if self.ipn_cache.fill(&listing) {
            tracing::debug!(parts = listing.len(), "ipn cache built from listing");
        }
        listing
            .into_iter()
            .map(|record| self.row(&Fetched::record_only(record)))
            .collect()
    }

    async fn filtered(&self, filter: &Filter) -> Result<Parts, PluginError> {
        let pk = match filter.column.as_str() {
            "PK" => key_text(&filter.value)?,
            "IPN" => match key_text(&filter.value)? {
                Some(ipn) => self.ipn_cache.lookup(&ipn, || self.listing()).await?,
                None => None,
            },
            other => {
                return Err(PluginError::adapter(format!("column {other} cannot be filtered")));
            }
        };
        let Some(pk) = pk else {
            return Ok(Vec::new());
        };

        let fetched = fetch_part(self.api.clone(), pk, self.secondary).await?;
        Ok(vec![self.row(&fetched)?])
    }

    fn row(&self, fetched: &Fetched) -> Result<Part, PluginError> {
        let mut part = Part::with_capacity(self.fields.len());
        for (name, mapping) in self.fields.iter() {
            let object = match mapping.source.origin {
                Origin::Record => &fetched.record,
                Origin::Metadata => &fetched.metadata,
                Origin::Parameters => &fetched.parameters,
            };
            let value = mapping
                .resolve(object)
                .map_err(|e| e.with_context(format!("column {name}")))?;
            part.insert(name.to_string(), value);
        }
        Ok(part)
    }
}

impl KomPlugin for InventreePlugin {
    fn init<'a>(
        &'a mut self,
        settings: &'a dyn Settings,
        args: &'a PluginArguments,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + 'a>> {
        Box::pin(async move {
            let http = reqwest::Client::builder()
                .build()
                .map_err(|e| PluginError::config(format!("HTTP client: {e}")))?;
            let creds = auth::bootstrap(settings, &http).await?;
            let api = Arc::new(HttpInventree::new(http, &creds.server, creds.token));
            self.configure(api, args).await
        })
    }

    fn column_names(&self) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.fields.names())
            .unwrap_or_default()
    }

    fn can_filter(&self, column: &str) -> bool {
        column == "PK" || column == "IPN"
    }

    fn parts<'a>(
        &'a self,
        filter: Option<&'a Filter>,
    ) -> Pin<Box<dyn Future<Output = Result<Parts, PluginError>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.configured()?;
            match filter {
                Some(filter) => state.filtered(filter).await,
                None => state.all_parts().await,
            }
        })
    }
}
