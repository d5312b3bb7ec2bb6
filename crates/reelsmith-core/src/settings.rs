//! Process-wide generation settings and the asset library they carry.
//!
//! An orchestration run receives an [`AppSettings`] snapshot by reference and
//! never mutates it; edits made by a front end between runs go through the
//! library methods below so that selections never point at deleted assets.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::assets::{Asset, AssetKind};

/// File-name prefix used when the user has not configured one.
pub const DEFAULT_FILE_PREFIX: &str = "duan";

/// Base name used when both the selected character and the prefix are empty.
pub const FALLBACK_BASE_NAME: &str = "duan";

/// Default pause between the image and video stages, and between tasks.
pub const DEFAULT_DELAY_SECS: u64 = 10;

/// Image generation engine variants.
///
/// Only [`ImageEngine::Pro`] accepts an explicit output size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum ImageEngine {
    /// Highest quality, slower.
    #[default]
    #[strum(to_string = "gemini-3-pro-image-preview", serialize = "pro")]
    #[serde(rename = "gemini-3-pro-image-preview", alias = "pro")]
    Pro,
    /// Fastest.
    #[strum(to_string = "gemini-2.5-flash-image", serialize = "flash")]
    #[serde(rename = "gemini-2.5-flash-image", alias = "flash")]
    Flash,
}

impl ImageEngine {
    /// Upstream model identifier.
    pub fn model_id(&self) -> &'static str {
        match self {
            ImageEngine::Pro => "gemini-3-pro-image-preview",
            ImageEngine::Flash => "gemini-2.5-flash-image",
        }
    }

    /// Explicit output size, for the engines that accept one.
    pub fn image_size(&self) -> Option<&'static str> {
        match self {
            ImageEngine::Pro => Some("1K"),
            ImageEngine::Flash => None,
        }
    }

    /// Short human-readable quality label used in task log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ImageEngine::Pro => "Best Quality",
            ImageEngine::Flash => "Fast",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum AspectRatio {
    #[default]
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Landscape,
    #[strum(serialize = "1:1")]
    #[serde(rename = "1:1")]
    Square,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Portrait,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum Resolution {
    #[default]
    #[strum(serialize = "720p")]
    #[serde(rename = "720p")]
    Hd,
    #[strum(serialize = "1080p")]
    #[serde(rename = "1080p")]
    FullHd,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("asset not found: {0}")]
    UnknownAsset(String),

    #[error("asset name must not be blank")]
    BlankName,
}

/// Configuration consumed by the orchestrator.
///
/// At most one character and one context can be selected at any time.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub engine: ImageEngine,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    /// Cooldown after each image stage and between tasks, in seconds.
    pub delay_secs: u64,
    pub file_prefix: String,
    pub assets: Vec<Asset>,
    pub selected_character_id: Option<String>,
    pub selected_context_id: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            engine: ImageEngine::default(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            delay_secs: DEFAULT_DELAY_SECS,
            file_prefix: DEFAULT_FILE_PREFIX.to_owned(),
            assets: Vec::new(),
            selected_character_id: None,
            selected_context_id: None,
        }
    }
}

impl AppSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Case-insensitive lookup by label within one asset kind.
    pub fn find_asset_by_name(&self, name: &str, kind: AssetKind) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|a| a.kind == kind && a.name.eq_ignore_ascii_case(name))
    }

    pub fn selected_character(&self) -> Option<&Asset> {
        self.selected_character_id
            .as_deref()
            .and_then(|id| self.asset(id))
    }

    pub fn selected_context(&self) -> Option<&Asset> {
        self.selected_context_id
            .as_deref()
            .and_then(|id| self.asset(id))
    }

    /// Stem used for generated file names: the selected character's name,
    /// else the configured prefix, else [`FALLBACK_BASE_NAME`].
    pub fn base_name(&self) -> &str {
        if let Some(character) = self.selected_character() {
            return &character.name;
        }
        let prefix = self.file_prefix.trim();
        if prefix.is_empty() {
            FALLBACK_BASE_NAME
        } else {
            prefix
        }
    }

    /// Add an asset to the library and select it in its slot.
    ///
    /// A newly added character also becomes the file prefix.
    pub fn add_asset(
        &mut self,
        name: &str,
        kind: AssetKind,
        mime_type: impl Into<String>,
        data: Bytes,
    ) -> Result<&Asset, SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::BlankName);
        }
        let asset = Asset::new(name, kind, mime_type, data);
        let id = asset.id.clone();
        self.assets.push(asset);
        self.select_asset(&id)?;
        self.asset(&id).ok_or(SettingsError::UnknownAsset(id))
    }

    /// Select an asset in its slot, replacing any previous selection there.
    pub fn select_asset(&mut self, id: &str) -> Result<(), SettingsError> {
        let (kind, name) = self
            .asset(id)
            .map(|a| (a.kind, a.name.clone()))
            .ok_or_else(|| SettingsError::UnknownAsset(id.to_owned()))?;
        match kind {
            AssetKind::Character => {
                self.file_prefix = name;
                self.selected_character_id = Some(id.to_owned());
            }
            AssetKind::Context => {
                self.selected_context_id = Some(id.to_owned());
            }
        }
        Ok(())
    }

    /// Deselect the asset if it is selected in its slot, otherwise select it.
    pub fn toggle_asset(&mut self, id: &str) -> Result<(), SettingsError> {
        let kind = self
            .asset(id)
            .map(|a| a.kind)
            .ok_or_else(|| SettingsError::UnknownAsset(id.to_owned()))?;
        let slot = match kind {
            AssetKind::Character => &mut self.selected_character_id,
            AssetKind::Context => &mut self.selected_context_id,
        };
        if slot.as_deref() == Some(id) {
            *slot = None;
            Ok(())
        } else {
            self.select_asset(id)
        }
    }

    /// Remove an asset, clearing any selection that points at it.
    pub fn delete_asset(&mut self, id: &str) -> Result<Asset, SettingsError> {
        let pos = self
            .assets
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| SettingsError::UnknownAsset(id.to_owned()))?;
        let removed = self.assets.remove(pos);
        if self.selected_character_id.as_deref() == Some(id) {
            self.selected_character_id = None;
        }
        if self.selected_context_id.as_deref() == Some(id) {
            self.selected_context_id = None;
        }
        Ok(removed)
    }
}

/// Default asset label for an uploaded file: the stem, truncated to 15
/// characters, with everything but ASCII letters and digits removed.
pub fn suggest_asset_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or_default();
    stem.chars()
        .take(15)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
