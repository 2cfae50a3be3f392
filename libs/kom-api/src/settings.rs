use crate::error::PluginError;

/// Key-value settings store a plugin reads its credentials from.
///
/// Implemented by the adapter on top of a host table. Reads must fail with
/// [`ErrorKind::Settings`](crate::error::ErrorKind::Settings) both when the
/// key is absent and when it is present more than once.
pub trait Settings {
    /// Value stored under `key`, or `None` when the key is absent. A key
    /// present more than once is an error.
    fn find_setting(&self, key: &str) -> Result<Option<String>, PluginError>;

    fn read_setting(&self, key: &str) -> Result<String, PluginError> {
        self.find_setting(key)?
            .ok_or_else(|| PluginError::settings(format!("no setting found for {key}")))
    }

    fn write_setting(&self, key: &str, value: &str) -> Result<(), PluginError>;

    fn delete_setting(&self, key: &str) -> Result<(), PluginError>;
}

/// In-memory settings, for tests and embedding without a host table.
///
/// Duplicate keys are kept as-is so that the duplicate-key error path can be
/// exercised.
#[derive(Debug, Default)]
pub struct MemorySettings {
    entries: std::cell::RefCell<Vec<(String, String)>>,
}

impl MemorySettings {
    pub fn new<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            entries: std::cell::RefCell::new(
                entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl Settings for MemorySettings {
    fn find_setting(&self, key: &str) -> Result<Option<String>, PluginError> {
        let entries = self.entries.borrow();
        let mut matching = entries.iter().filter(|(k, _)| k == key);
        match (matching.next(), matching.next()) {
            (Some((_, v)), None) => Ok(Some(v.clone())),
            (None, _) => Ok(None),
            (Some(_), Some(_)) => Err(PluginError::settings(format!(
                "multiple settings found for {key}"
            ))),
        }
    }

    fn write_setting(&self, key: &str, value: &str) -> Result<(), PluginError> {
        self.entries
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<(), PluginError> {
        self.entries.borrow_mut().retain(|(k, _)| k != key);
        Ok(())
    }
}
