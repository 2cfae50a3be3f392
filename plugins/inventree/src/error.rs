use kom_api::error::PluginError;

/// Failure talking to the InvenTree server.
#[derive(Debug, thiserror::Error)]
pub enum InventreeError {
    #[error("request to {resource} failed: {source}")]
    Request {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code {status} from {resource}")]
    Status {
        resource: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode {resource}: {source}")]
    Body {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode {resource}: {source}")]
    Json {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<InventreeError> for PluginError {
    fn from(e: InventreeError) -> Self {
        let message = e.to_string();
        match e {
            InventreeError::Status { status, .. }
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN =>
            {
                PluginError::auth(message)
            }
            InventreeError::Request { .. } | InventreeError::Status { .. } => {
                PluginError::transport(message)
            }
            InventreeError::Body { .. } | InventreeError::Json { .. } => PluginError::decode(message),
        }
    }
}
