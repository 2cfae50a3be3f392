use serde::Deserialize;
use serde::de::DeserializeOwned;

use kom_api::value::Value;

use crate::api::{ApiFuture, Category, InventreeApi};
use crate::error::InventreeError;

const TOKEN_RESOURCE: &str = "/api/user/token/";

/// [`InventreeApi`] over HTTP with token authorization.
pub struct HttpInventree {
    http: reqwest::Client,
    server: String,
    token: String,
}

impl HttpInventree {
    pub fn new(http: reqwest::Client, server: &str, token: impl Into<String>) -> Self {
        Self {
            http,
            server: server.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<T, InventreeError> {
        tracing::debug!(%resource, ?query, "inventree request");
        let resp = self
            .http
            .get(format!("{}{resource}", self.server))
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .query(query)
            .send()
            .await
            .map_err(|source| InventreeError::Request {
                resource: resource.to_string(),
                source,
            })?;
        decode(resource, resp).await
    }
}

async fn decode<T: DeserializeOwned>(resource: &str, resp: reqwest::Response) -> Result<T, InventreeError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(InventreeError::Status {
            resource: resource.to_string(),
            status,
        });
    }
    let body = resp.bytes().await.map_err(|source| InventreeError::Body {
        resource: resource.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| InventreeError::Json {
        resource: resource.to_string(),
        source,
    })
}

fn values(list: Vec<serde_json::Value>) -> Vec<Value> {
    list.into_iter().map(Value::from).collect()
}

impl InventreeApi for HttpInventree {
    fn categories(&self) -> ApiFuture<'_, Vec<Category>> {
        Box::pin(async move { Ok(self.get("/api/part/category/", &[]).await?) })
    }

    fn parts_in_category(&self, category: i64) -> ApiFuture<'_, Vec<Value>> {
        Box::pin(async move {
            let list = self
                .get("/api/part/", &[("category", category.to_string())])
                .await?;
            Ok(values(list))
        })
    }

    fn part<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            let part: serde_json::Value = self.get(&format!("/api/part/{pk}/"), &[]).await?;
            Ok(part.into())
        })
    }

    fn part_metadata<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            let metadata: serde_json::Value =
                self.get(&format!("/api/part/{pk}/metadata/"), &[]).await?;
            Ok(metadata.into())
        })
    }

    fn part_parameters<'a>(&'a self, pk: &'a str) -> ApiFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let list = self
                .get("/api/part/parameter/", &[("part", pk.to_string())])
                .await?;
            Ok(values(list))
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Exchange a username and password for an API token (basic auth).
pub async fn exchange_token(
    http: &reqwest::Client,
    server: &str,
    username: &str,
    password: &str,
) -> Result<String, InventreeError> {
    let resp = http
        .get(format!("{}{TOKEN_RESOURCE}", server.trim_end_matches('/')))
        .basic_auth(username, Some(password))
        .send()
        .await
        .map_err(|source| InventreeError::Request {
            resource: TOKEN_RESOURCE.to_string(),
            source,
        })?;
    let token: TokenResponse = decode(TOKEN_RESOURCE, resp).await?;
    Ok(token.token)
}
