//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::state::AppState;
use crate::models::FramingRule;
use crate::tokenizer::Message;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Health and status
        .route("/health", get(health_check))
        .route("/status", get(status))
        // Model tables
        .route("/models", get(list_models))
        // Token counting
        .route("/tokenizer/:model", post(count_tokens))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    if state.config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    if state.config.logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the server is serving
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Status response
#[derive(Serialize)]
pub struct StatusResponse {
    /// Always `ok` while the server is serving
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Where rank files are loaded from
    pub vocabulary_source: String,
    /// Encodings currently held in the store
    pub cached_encodings: Vec<&'static str>,
    /// Encodings built since startup
    pub encodings_loaded: usize,
}

/// Status endpoint
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.counter.store();

    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime().as_secs(),
        vocabulary_source: store.source(),
        cached_encodings: store.cached(),
        encodings_loaded: store.load_count(),
    })
}

/// Snapshot entry in the models listing
#[derive(Serialize)]
pub struct SnapshotEntry<'a> {
    /// Dated snapshot name
    pub name: &'a str,
    /// Per-message and per-name framing
    #[serde(flatten)]
    pub rule: FramingRule,
    /// Encoding the snapshot resolves to, if any
    pub encoding: Option<&'a str>,
}

/// List snapshots, aliases and families
async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resolver = state.counter.resolver();
    let framing = state.counter.framing();

    let snapshots: Vec<SnapshotEntry<'_>> = framing
        .snapshots()
        .into_iter()
        .map(|(name, rule)| SnapshotEntry {
            name,
            rule,
            encoding: resolver.encoding_for(name).ok(),
        })
        .collect();

    Json(serde_json::json!({
        "reply_priming_tokens": framing.reply_priming_tokens(),
        "snapshots": snapshots,
        "aliases": resolver
            .aliases()
            .into_iter()
            .map(|(alias, snapshot)| serde_json::json!({"alias": alias, "snapshot": snapshot}))
            .collect::<Vec<_>>(),
        "families": resolver.families(),
    }))
}

/// Tokenizer request body: one message or a list of messages
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TokenizerRequest {
    /// A single message
    One(Message),
    /// A message list
    Many(Vec<Message>),
}

impl TokenizerRequest {
    /// Messages to count
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            TokenizerRequest::One(message) => vec![message],
            TokenizerRequest::Many(messages) => messages,
        }
    }
}

/// Tokenizer response envelope
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerResponse {
    /// HTTP status code, repeated in the body
    pub code: u16,
    /// Token count, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tokens: Option<usize>,
    /// Error message, on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Count tokens for a model
async fn count_tokens(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    Json(req): Json<TokenizerRequest>,
) -> impl IntoResponse {
    let messages = req.into_messages();

    match state.counter.count_tokens(&messages, &model).await {
        Ok(num_tokens) => (
            StatusCode::OK,
            Json(TokenizerResponse {
                code: StatusCode::OK.as_u16(),
                num_tokens: Some(num_tokens),
                msg: None,
            }),
        ),
        Err(e) => {
            tracing::error!(model = %model, error = ?e, "Token counting failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TokenizerResponse {
                    code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    num_tokens: None,
                    msg: Some(e.to_string()),
                }),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_single_or_many() {
        let one: TokenizerRequest =
            serde_json::from_str(r#"{"role":"user","content":"hi","name":"bob"}"#).unwrap();
        let messages = one.into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name.as_deref(), Some("bob"));

        let many: TokenizerRequest = serde_json::from_str(
            r#"[{"role":"system","content":"be brief"},{"role":"user","content":"hi"}]"#,
        )
        .unwrap();
        assert_eq!(many.into_messages().len(), 2);
    }

    #[test]
    fn test_request_requires_content() {
        assert!(serde_json::from_str::<TokenizerRequest>(r#"{"role":"user"}"#).is_err());
    }

    #[test]
    fn test_response_envelope_shape() {
        let ok = TokenizerResponse {
            code: 200,
            num_tokens: Some(12),
            msg: None,
        };
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"code":200,"num_tokens":12}"#
        );

        let err = TokenizerResponse {
            code: 500,
            num_tokens: None,
            msg: Some("Unsupported model: x".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"code":500,"msg":"Unsupported model: x"}"#
        );
    }
}
