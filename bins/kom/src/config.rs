use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CliError;

/// Settings file for `kom settings import`.
///
/// ```toml
/// server = "https://inventree.example.com"
/// username = "kicad"
/// password = "secret"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SettingsFile {
    entries: BTreeMap<String, toml::Value>,
}

impl SettingsFile {
    pub fn load(path: &str) -> Result<Self, CliError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CliError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| match e {
            CliError::Config(msg) => CliError::Config(format!("{path}: {msg}")),
            other => other,
        })
    }

    pub fn parse(toml_str: &str) -> Result<Self, CliError> {
        toml::from_str(toml_str).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Entries as stored in the settings table. Scalars are written in their
    /// TOML text form; tables and arrays are rejected.
    pub fn entries(&self) -> Result<Vec<(String, String)>, CliError> {
        self.entries
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Datetime(d) => d.to_string(),
                    toml::Value::Array(_) | toml::Value::Table(_) => {
                        return Err(CliError::Config(format!("setting `{key}` must be a scalar")));
                    }
                };
                Ok((key.clone(), text))
            })
            .collect()
    }
}
