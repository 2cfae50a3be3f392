mod common;

use kom_api::config::PluginArguments;
use kom_api::error::ErrorKind;
use kom_api::plugin::{Filter, KomPlugin};
use kom_api::settings::{MemorySettings, Settings};
use kom_api::value::Value;
use kom_inventree::api::InventreeApi;
use kom_inventree::{HttpInventree, InventreePlugin, auth};

use common::{MockState, PASSWORD, TOKEN, USERNAME};

#[tokio::test]
async fn client_reads_every_endpoint() {
    let state = MockState::default();
    let server = common::spawn(state.clone()).await;
    let api = HttpInventree::new(reqwest::Client::new(), &format!("{server}/"), TOKEN);

    let categories = api.categories().await.unwrap();
    assert_eq!(categories.len(), 3);
    assert_eq!(categories[1].pathstring, "Electronics/Resistors");

    let parts = api.parts_in_category(2).await.unwrap();
    assert_eq!(parts.len(), 2);

    let part = api.part("3").await.unwrap();
    assert_eq!(part.get("IPN"), Some(&Value::from("C-001")));

    let metadata = api.part_metadata("1").await.unwrap();
    assert_eq!(
        metadata.lookup(&["metadata", "kicad", "symbols"]).present(),
        Some(&Value::from("Device:R"))
    );

    let parameters = api.part_parameters("1").await.unwrap();
    assert_eq!(parameters.len(), 2);

    assert_eq!(state.count("/api/part/?category=2"), 1);
    assert_eq!(state.count("/api/part/parameter/?part=1"), 1);
}

#[tokio::test]
async fn status_errors_are_reported() {
    let server = common::spawn(MockState::default()).await;

    let api = HttpInventree::new(reqwest::Client::new(), &server, TOKEN);
    let err = api.part("404").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert!(err.message.contains("404 Not Found"), "{}", err.message);

    let api = HttpInventree::new(reqwest::Client::new(), &server, "wrong");
    let err = api.categories().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Auth);
    assert!(err.message.contains("401 Unauthorized"), "{}", err.message);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let api = HttpInventree::new(reqwest::Client::new(), "http://127.0.0.1:1", TOKEN);
    let err = api.categories().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
}

#[tokio::test]
async fn password_is_exchanged_for_a_token() {
    let state = MockState::default();
    let server = common::spawn(state.clone()).await;
    let settings = MemorySettings::new([
        ("server", server.as_str()),
        ("username", USERNAME),
        ("password", PASSWORD),
    ]);

    let creds = auth::bootstrap(&settings, &reqwest::Client::new()).await.unwrap();
    assert_eq!(creds.token, TOKEN);
    assert_eq!(settings.read_setting("api_token").unwrap(), TOKEN);
    assert_eq!(settings.get("password"), None);
    assert_eq!(state.count("/api/user/token/"), 1);

    // second start uses the stored token
    auth::bootstrap(&settings, &reqwest::Client::new()).await.unwrap();
    assert_eq!(state.count("/api/user/token/"), 1);
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let server = common::spawn(MockState::default()).await;
    let settings = MemorySettings::new([
        ("server", server.as_str()),
        ("username", USERNAME),
        ("password", "guess"),
    ]);

    let err = auth::bootstrap(&settings, &reqwest::Client::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Auth);
    assert!(err.message.starts_with("token exchange: "), "{}", err.message);
    assert_eq!(settings.get("api_token"), None);
}

#[tokio::test]
async fn plugin_initializes_over_http() {
    let state = MockState::default();
    let server = common::spawn(state.clone()).await;
    let settings = MemorySettings::new([
        ("server", server.as_str()),
        ("username", USERNAME),
        ("api_token", TOKEN),
    ]);
    let args: PluginArguments = [
        ("categories", "Electronics/Resistors"),
        ("fields", "Resistance:parameters.Resistance"),
    ]
    .into_iter()
    .collect();

    let mut plugin = InventreePlugin::new();
    plugin.init(&settings, &args).await.unwrap();

    let filter = Filter {
        column: "IPN".into(),
        value: Value::from("R-001"),
    };
    let rows = plugin.parts(Some(&filter)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Symbols"], Value::from("Device:R"));
    assert_eq!(rows[0]["Resistance"], Value::from("10k"));

    assert_eq!(state.count("/api/part/category/"), 1);
    assert_eq!(state.count("/api/part/?category=2"), 1);
    assert_eq!(state.count("/api/part/1/"), 1);
    assert_eq!(state.count("/api/part/1/metadata/"), 1);
    assert_eq!(state.count("/api/part/parameter/?part=1"), 1);
}

#[test]
fn plugin_is_registered_by_name() {
    let mut registry = kom_api::plugin::PluginRegistry::new();
    kom_inventree::register(&mut registry);
    assert_eq!(registry.names(), [kom_inventree::PLUGIN_NAME]);
    let plugin = registry.create("inventree").unwrap();
    assert!(plugin.can_filter("IPN"));
}
