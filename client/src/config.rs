use crate::ai::{AiSettings, DEFAULT_MODEL, PERSONA};
use crate::chat::ChatConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default wait before a regular contact's simulated reply.
pub const DEFAULT_REPLY_DELAY_MS: u64 = 1000;

/// Runtime configuration for the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Holds `users.json` and `background.json`.
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub reply_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = env::var("GLASSCHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let api_key = env::var("API_KEY").ok().filter(|key| !key.trim().is_empty());
        let model = env::var("GLASSCHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let reply_delay_ms = env::var("GLASSCHAT_REPLY_DELAY_MS")
            .ok()
            .and_then(|ms| ms.parse().ok())
            .unwrap_or(DEFAULT_REPLY_DELAY_MS);
        Ok(Self {
            data_dir,
            api_key,
            model,
            reply_delay: Duration::from_millis(reply_delay_ms),
        })
    }

    pub fn ai_settings(&self) -> AiSettings {
        AiSettings {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            persona: PERSONA.to_string(),
        }
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            reply_delay: self.reply_delay,
        }
    }
}

fn default_data_dir() -> PathBuf {
    let base = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(base).join(".glasschat")
}
