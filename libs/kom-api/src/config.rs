/// Module arguments handed to a plugin at table creation.
///
/// Built by the adapter from the `CREATE VIRTUAL TABLE ... USING kom(...)`
/// argument list after `plugin` and `settings` are consumed. Keys keep their
/// first-seen order; a repeated key overwrites the earlier value. Values are
/// already unquoted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginArguments {
    entries: Vec<(String, String)>,
}

impl PluginArguments {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `name`, or a config error naming the missing argument.
    pub fn require(&self, name: &str) -> Result<&str, crate::error::PluginError> {
        self.get(name).ok_or_else(|| {
            crate::error::PluginError::config(format!("{name} is a required argument"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PluginArguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (k, v) in iter {
            args.set(k, v);
        }
        args
    }
}
