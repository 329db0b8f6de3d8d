//! HTTP transport exposing matching over a query-string API.
//!
//! `GET /?action=..&subject=..&object=..` where `subject` and `object` are
//! JSON-encoded attribute maps. Every response is a JSON object:
//! `{"match": true, "id": ".."}`, `{"match": false}` or `{"error": ".."}`.

use crate::api::{Attributes, MatchDecision, PolicyStore, Request};
use crate::Result;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Query parameters of a match request.
#[derive(Debug, Default, Deserialize)]
pub struct MatchQuery {
    /// Requested action
    #[serde(default)]
    pub action: String,
    /// JSON-encoded subject attributes
    #[serde(default)]
    pub subject: String,
    /// JSON-encoded object attributes
    #[serde(default)]
    pub object: String,
}

/// Body of a match response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    /// Whether the request matched; absent on error
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    /// ID of the matched policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchResponse {
    /// An error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            matched: None,
            id: None,
            error: Some(message.into()),
        }
    }
}

impl From<&MatchDecision> for MatchResponse {
    fn from(decision: &MatchDecision) -> Self {
        Self {
            matched: Some(decision.matched),
            id: decision.policy_id().map(str::to_string),
            error: None,
        }
    }
}

/// Body of a health response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the server runs
    pub status: String,
    /// Number of loaded policies
    pub policies: usize,
}

/// Build the router serving `store`.
pub fn router(store: Arc<PolicyStore>) -> Router {
    Router::new()
        .route("/", get(match_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Serve `store` on `addr` until `shutdown` resolves.
pub async fn serve(
    store: Arc<PolicyStore>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server starting on {}", listener.local_addr()?);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn match_handler(
    State(store): State<Arc<PolicyStore>>,
    Query(query): Query<MatchQuery>,
) -> Json<MatchResponse> {
    Json(respond(&store, query))
}

async fn health_handler(State(store): State<Arc<PolicyStore>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        policies: store.policy_count(),
    })
}

fn respond(store: &PolicyStore, query: MatchQuery) -> MatchResponse {
    let object = match parse_attributes("object", &query.object) {
        Ok(attributes) => attributes,
        Err(response) => return response,
    };
    let subject = match parse_attributes("subject", &query.subject) {
        Ok(attributes) => attributes,
        Err(response) => return response,
    };

    let request = Request::new(query.action, subject, object);
    match store.evaluate(&request) {
        Ok(decision) => MatchResponse::from(&decision),
        Err(e) => {
            warn!(category = e.category(), "match failed: {}", e);
            MatchResponse::error(e.to_string())
        }
    }
}

fn parse_attributes(field: &str, raw: &str) -> std::result::Result<Attributes, MatchResponse> {
    serde_json::from_str(raw).map_err(|e| {
        MatchResponse::error(format!("JSON parse error: '{}' must be valid JSON: {}", field, e))
    })
}
