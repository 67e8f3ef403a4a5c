pub mod error;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod rooms;

use std::sync::Arc;

use spark_core::{ChatService, MatchEngine};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: MatchEngine,
    pub chat: ChatService,
    pub api_key: String,
}
