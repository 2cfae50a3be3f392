use kom_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum VtabError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl VtabError {
    /// Add context to the error.
    ///
    /// For `Plugin` variant, context is added to the inner `PluginError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            VtabError::Plugin(e) => VtabError::Plugin(e.with_context(ctx)),
            VtabError::Config(msg) => VtabError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

/// SQLite only carries a message back to the statement that failed.
impl From<VtabError> for rusqlite::Error {
    fn from(e: VtabError) -> Self {
        match e {
            VtabError::Sqlite(inner) => inner,
            other => rusqlite::Error::ModuleError(other.to_string()),
        }
    }
}
