
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::assistant::RetrievalAssistant;
use crate::{RagError, Result};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const CHAT_JS: &str = include_str!("../../static/chat.js");

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Routes: the chat page and its script, and `POST /` answering `{query}`
#[inline]
pub fn router(assistant: Arc<RetrievalAssistant>) -> Router {
    Router::new()
        .route("/", get(index).post(ask))
        .route("/static/chat.js", get(chat_js))
        .with_state(assistant)
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve until the process is stopped
#[inline]
pub async fn serve(assistant: Arc<RetrievalAssistant>, host: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .map_err(|e| RagError::Config(format!("Failed to bind {}:{}: {}", host, port, e)))?;

    info!("Serving chat assistant on http://{}:{}", host, port);
    axum::serve(listener, router(assistant)).await?;
    Ok(())
}

#[expect(clippy::unused_async, reason = "axum handlers are async")]
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[expect(clippy::unused_async, reason = "axum handlers are async")]
async fn chat_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CHAT_JS)
}

async fn ask(
    State(assistant): State<Arc<RetrievalAssistant>>,
    Json(request): Json<QueryRequest>,
) -> std::result::Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    match assistant.answer(&request.query).await {
        Ok(response) => Ok(Json(QueryResponse { response })),
        Err(e) => {
            error!("Failed to answer query: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
