//! Background preference - the chat screen's wallpaper.
//!
//! Holds either a predefined image URL or an uploaded image embedded as a
//! `data:` URL.

use crate::{AccountError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Built-in wallpapers as `(id, url)`.
pub const PREDEFINED_BACKGROUNDS: [(&str, &str); 6] = [
    ("aurora", "https://picsum.photos/seed/aurora/1920/1080"),
    ("mountains", "https://picsum.photos/seed/mountains/1920/1080"),
    ("galaxy", "https://picsum.photos/seed/galaxy/1920/1080"),
    ("forest", "https://picsum.photos/seed/forest/1920/1080"),
    ("beach", "https://picsum.photos/seed/beach/1920/1080"),
    ("abstract", "https://picsum.photos/seed/abstract/1920/1080"),
];

/// Used until the user picks something else.
pub const DEFAULT_BACKGROUND: &str = PREDEFINED_BACKGROUNDS[0].1;

const BACKGROUND_FILE: &str = "background.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackgroundPreference {
    background: String,
}

#[derive(Debug, Clone)]
pub struct BackgroundStore {
    path: PathBuf,
}

impl BackgroundStore {
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(BACKGROUND_FILE),
        }
    }

    /// Current background, falling back to the default when nothing was
    /// saved or the file cannot be read.
    pub fn load(&self) -> String {
        if !self.path.exists() {
            return DEFAULT_BACKGROUND.to_string();
        }
        let parsed = fs::read_to_string(&self.path)
            .map_err(AccountError::from)
            .and_then(|data| Ok(serde_json::from_str::<BackgroundPreference>(&data)?));
        match parsed {
            Ok(pref) => pref.background,
            Err(err) => {
                warn!(%err, path = %self.path.display(), "ignoring unreadable background preference");
                DEFAULT_BACKGROUND.to_string()
            }
        }
    }

    /// Persists `background` as-is.
    pub fn save(&self, background: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&BackgroundPreference {
            background: background.to_string(),
        })?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Switches to the predefined background `id`.
    pub fn select(&self, id: &str) -> Result<String> {
        let url = predefined_url(id).ok_or_else(|| AccountError::UnknownBackground(id.to_string()))?;
        self.save(url)?;
        info!(id, "background selected");
        Ok(url.to_string())
    }

    /// Reads an image file and stores it as an embedded `data:` reference.
    pub fn upload(&self, file: &Path) -> Result<String> {
        let mime = image_mime(file)?;
        let bytes = fs::read(file)?;
        let data_url = format!("data:{mime};base64,{}", STANDARD.encode(&bytes));
        self.save(&data_url)?;
        info!(file = %file.display(), size = bytes.len(), "custom background uploaded");
        Ok(data_url)
    }
}

pub fn predefined_url(id: &str) -> Option<&'static str> {
    PREDEFINED_BACKGROUNDS
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, url)| *url)
}

fn image_mime(file: &Path) -> Result<&'static str> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        "bmp" => Ok("image/bmp"),
        "svg" => Ok("image/svg+xml"),
        _ => Err(AccountError::UnsupportedImage(file.display().to_string())),
    }
}
