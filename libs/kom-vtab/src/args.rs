use kom_api::config::PluginArguments;

use crate::error::VtabError;

/// Module arguments of `CREATE VIRTUAL TABLE t USING kom(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArgs {
    /// Registered plugin name (`plugin=`).
    pub plugin: String,
    /// Settings table name (`settings=`).
    pub settings: String,
    /// Everything else, passed to the plugin verbatim.
    pub plugin_args: PluginArguments,
}

impl ModuleArgs {
    /// Parse `key=value` arguments. Values may be quoted with `'` or `"`.
    ///
    /// `plugin` and `settings` are required; all other keys go to the plugin.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, VtabError> {
        let mut plugin = None;
        let mut settings = None;
        let mut plugin_args = PluginArguments::new();

        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                VtabError::Config(format!("argument `{}` is not of the form key=value", arg.trim()))
            })?;
            let key = key.trim();
            let value = unquote(value);
            match key {
                "plugin" => plugin = Some(value),
                "settings" => settings = Some(value),
                _ => plugin_args.set(key, value),
            }
        }

        let plugin = plugin
            .filter(|p| !p.is_empty())
            .ok_or_else(|| VtabError::Config("plugin is a required argument".into()))?;
        let settings = settings
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VtabError::Config("settings is a required argument".into()))?;

        Ok(Self {
            plugin,
            settings,
            plugin_args,
        })
    }
}

/// Strip one level of SQL quoting. A doubled quote inside the literal stands
/// for a single one. Unquoted input is only trimmed.
pub fn unquote(literal: &str) -> String {
    let literal = literal.trim();
    for quote in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(quote) && literal.ends_with(quote) {
            let inner = &literal[1..literal.len() - 1];
            let doubled: String = [quote, quote].iter().collect();
            return inner.replace(&doubled, &quote.to_string());
        }
    }
    literal.to_string()
}

/// Quote an SQL identifier, keeping schema qualification (`main.settings`).
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}
