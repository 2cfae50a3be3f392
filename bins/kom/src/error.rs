use kom_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("settings error: {0}")]
    Settings(#[from] PluginError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
