use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use spark_api::middleware::require_api_key;
use spark_api::{AppState, AppStateInner, likes, matches, messages, rooms};
use spark_core::{ChatService, MatchEngine};
use spark_crypto::{MessageCipher, keys::key_from_base64};
use spark_gateway::{RoomBroker, connection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spark=debug,tower_http=debug".into()),
        )
        .init();

    // Config — a missing or malformed message key refuses to start
    let message_key = key_from_base64(
        &std::env::var("SPARK_MESSAGE_KEY").context("SPARK_MESSAGE_KEY must be set")?,
    )
    .context("SPARK_MESSAGE_KEY must be base64 of exactly 32 bytes")?;
    let api_key = std::env::var("SPARK_API_KEY").context("SPARK_API_KEY must be set")?;
    let db_path = std::env::var("SPARK_DB_PATH").unwrap_or_else(|_| "spark.db".into());
    let host = std::env::var("SPARK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SPARK_PORT")
        .unwrap_or_else(|_| "3001".into())
        .parse()?;

    // Init database
    let db = Arc::new(spark_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let broker = RoomBroker::new();
    let cipher = Arc::new(MessageCipher::new(message_key));
    let state: AppState = Arc::new(AppStateInner {
        engine: MatchEngine::new(db.clone()),
        chat: ChatService::new(db, cipher, broker.clone()),
        api_key,
    });

    // Routes
    let api_routes = Router::new()
        .route("/likes", post(likes::like))
        .route("/likes", delete(likes::unlike))
        .route("/likes/{user_id}", get(likes::list_likers))
        .route("/matches/{user_id}", get(matches::list_matches))
        .route("/matches/{user_id}/{other_id}", get(matches::match_between))
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/{room_id}/messages", post(messages::send_message))
        .route("/rooms/{room_id}/messages", get(messages::get_history))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .with_state(state);

    let ws_route = Router::new().route("/ws", get(ws_upgrade)).with_state(broker);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Spark server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(broker): State<RoomBroker>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, broker))
}
