pub mod ai;
pub mod chat;
pub mod config;
pub mod state;
pub mod terminal;

pub use ai::{AiGateway, AiReply, AiSession, AiSettings, GatewayError};
pub use chat::{ChatConfig, ChatError, ChatEvent, ChatScreen};
pub use config::AppConfig;
pub use state::ChatContext;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // stdout belongs to the chat transcript.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
