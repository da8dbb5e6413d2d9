use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wabridge_ipc::NetworkClient;

use crate::handlers;
use crate::state::AppState;

pub fn build_router<N: NetworkClient>(state: AppState<N>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health::<N>))
        // Store reads
        .route("/chats", get(handlers::chats::list_chats::<N>))
        .route("/chats/{jid}", get(handlers::chats::get_chat::<N>))
        .route("/messages", get(handlers::messages::list_messages::<N>))
        .route(
            "/messages/{id}/context",
            get(handlers::messages::message_context::<N>),
        )
        // Network commands
        .route("/send", post(handlers::send::send::<N>))
        .route("/download", post(handlers::download::download::<N>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
