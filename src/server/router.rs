use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, chats, documents, health, livedata};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check endpoint
/// - Chat completion (SSE) and chat/document persistence endpoints
/// - Live-data aggregation endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat-completion", post(chat::chat_completion))
        .route(
            "/api/chats",
            get(chats::list_chats).post(chats::create_chat),
        )
        .route(
            "/api/chats/:chat_id",
            get(chats::get_chat).delete(chats::delete_chat),
        )
        .route(
            "/api/chats/:chat_id/messages",
            get(chats::get_chat_messages),
        )
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/api/documents/:document_id",
            delete(documents::delete_document),
        )
        .route("/api/stock-market", get(livedata::stock_market))
        .route("/api/gold-prices", get(livedata::gold_prices))
        .route("/api/latest-news", get(livedata::latest_news))
        .route("/api/politics", get(livedata::politics))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    let allow_origin = AllowOrigin::list(
        default_local_origins()
            .into_iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect::<Vec<_>>(),
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn default_local_origins() -> Vec<&'static str> {
    vec![
        "http://localhost:5173",
        "http://127.0.0.1:5173",
        "http://localhost:8787",
        "http://127.0.0.1:8787",
    ]
}
