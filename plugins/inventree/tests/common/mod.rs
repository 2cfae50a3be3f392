//! In-process InvenTree stand-in.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};

pub const TOKEN: &str = "0123456789012345678901234567890123456789";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
/// `admin:secret`
const BASIC: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Clone, Default)]
pub struct MockState {
    /// Request paths, in arrival order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    pub fn count(&self, path: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

fn parts() -> Vec<(i64, Value)> {
    vec![
        (2, json!({"pk": 1, "IPN": "R-001", "name": "R 10k", "description": "Resistor 10k", "in_stock": 12.0})),
        (2, json!({"pk": 2, "IPN": "R-002", "name": "R 4k7", "description": "Resistor 4k7", "in_stock": null})),
        (3, json!({"pk": 3, "IPN": "C-001", "name": "C 100n", "description": "Capacitor 100n", "in_stock": 250})),
    ]
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/user/token/", get(handle_token))
        .route("/api/part/", get(handle_parts))
        .route("/api/part/category/", get(handle_categories))
        .route("/api/part/parameter/", get(handle_parameters))
        .route("/api/part/{pk}/", get(handle_part))
        .route("/api/part/{pk}/metadata/", get(handle_metadata))
        .with_state(state)
}

/// Serve on an ephemeral local port. Must be called inside a tokio runtime.
pub async fn spawn(state: MockState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

fn record(state: &MockState, path: String) {
    state.requests.lock().unwrap().push(path);
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Token {TOKEN}"))
}

fn guarded(headers: &HeaderMap, body: impl FnOnce() -> Option<Value>) -> Response {
    if !authorized(headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match body() {
        Some(body) => axum::Json(body).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn handle_token(State(state): State<MockState>, headers: HeaderMap) -> Response {
    record(&state, "/api/user/token/".into());
    let basic = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if basic != Some(BASIC) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    axum::Json(json!({"token": TOKEN})).into_response()
}

async fn handle_categories(State(state): State<MockState>, headers: HeaderMap) -> Response {
    record(&state, "/api/part/category/".into());
    guarded(&headers, || {
        Some(json!([
            {"pk": 1, "pathstring": "Electronics", "name": "Electronics"},
            {"pk": 2, "pathstring": "Electronics/Resistors", "name": "Resistors"},
            {"pk": 3, "pathstring": "Electronics/Capacitors", "name": "Capacitors"},
        ]))
    })
}

#[derive(Deserialize)]
struct CategoryParams {
    category: i64,
}

async fn handle_parts(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<CategoryParams>,
) -> Response {
    record(&state, format!("/api/part/?category={}", params.category));
    guarded(&headers, || {
        let list = parts()
            .into_iter()
            .filter(|(c, _)| *c == params.category)
            .map(|(_, p)| p)
            .collect();
        Some(Value::Array(list))
    })
}

fn find(pk: &str) -> Option<Value> {
    parts()
        .into_iter()
        .map(|(_, p)| p)
        .find(|p| p["pk"].to_string() == pk)
}

async fn handle_part(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(pk): Path<String>,
) -> Response {
    record(&state, format!("/api/part/{pk}/"));
    guarded(&headers, || find(&pk))
}

async fn handle_metadata(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(pk): Path<String>,
) -> Response {
    record(&state, format!("/api/part/{pk}/metadata/"));
    guarded(&headers, || {
        find(&pk)?;
        Some(match pk.as_str() {
            "1" => json!({"metadata": {"kicad": {"symbols": "Device:R", "footprints": "Resistor_SMD:R_0603"}}}),
            _ => json!({"metadata": null}),
        })
    })
}

async fn handle_parameters(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let pk = params.get("part").cloned().unwrap_or_default();
    record(&state, format!("/api/part/parameter/?part={pk}"));
    guarded(&headers, || {
        Some(match pk.as_str() {
            "1" => json!([
                {"pk": 10, "part": 1, "template_detail": {"pk": 1, "name": "Resistance"}, "data": "10k"},
                {"pk": 11, "part": 1, "template_detail": {"pk": 2, "name": "Power"}, "data": "0.1"},
            ]),
            _ => json!([]),
        })
    })
}
