pub mod chat;
pub mod error;
pub mod match_engine;

pub use chat::ChatService;
pub use error::CoreError;
pub use match_engine::MatchEngine;
