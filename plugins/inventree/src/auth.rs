use kom_api::error::PluginError;
use kom_api::settings::Settings;

use crate::client::exchange_token;

/// Server address and token the plugin talks to the API with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub token: String,
}

/// Read credentials from the settings table.
///
/// Without a stored `api_token`, the `password` setting is exchanged for a
/// token which is then persisted. Once a token is known the password is
/// removed from the settings table. Any failure of the exchange itself is an
/// [`ErrorKind::Auth`](kom_api::error::ErrorKind::Auth) error.
pub async fn bootstrap(
    settings: &dyn Settings,
    http: &reqwest::Client,
) -> Result<Credentials, PluginError> {
    let server = settings.read_setting("server")?;
    let username = settings.read_setting("username")?;

    let token = match settings.find_setting("api_token")? {
        Some(token) => token,
        None => {
            tracing::debug!("no stored api token");
            let password = settings.read_setting("password")?;
            let token = exchange_token(http, &server, &username, &password)
                .await
                .map_err(|e| {
                    PluginError::auth(PluginError::from(e).message).with_context("token exchange")
                })?;
            settings.write_setting("api_token", &token)?;
            tracing::info!(%server, %username, "obtained api token");
            token
        }
    };
    settings.delete_setting("password")?;

    Ok(Credentials {
        server,
        username,
        token,
    })
}
