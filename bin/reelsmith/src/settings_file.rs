//! TOML settings file: generation settings plus the asset library.
//!
//! ```toml
//! engine = "flash"
//! aspect_ratio = "9:16"
//! delay_secs = 15
//! character = "Lucy"
//!
//! [[assets]]
//! name = "Lucy"
//! kind = "character"
//! path = "refs/lucy.png"
//!
//! [[assets]]
//! kind = "context"
//! path = "refs/neon-city.jpg"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use reelsmith_core::assets::AssetKind;
use reelsmith_core::settings::{suggest_asset_name, AppSettings, AspectRatio, ImageEngine, Resolution};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub engine: Option<ImageEngine>,
    pub aspect_ratio: Option<AspectRatio>,
    pub resolution: Option<Resolution>,
    pub delay_secs: Option<u64>,
    pub file_prefix: Option<String>,
    /// Name of the character asset to select after loading.
    pub character: Option<String>,
    /// Name of the context asset to select after loading.
    pub context: Option<String>,
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetEntry {
    /// Defaults to a label derived from the file name.
    pub name: Option<String>,
    pub kind: AssetKind,
    /// Relative paths are resolved against the settings file's directory.
    pub path: PathBuf,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// Load every asset into `settings` and apply the scalar settings.
    ///
    /// Assets are added in file order, so the last asset of each kind ends up
    /// selected unless `character` / `context` name another one.
    pub fn apply(self, base_dir: &Path, settings: &mut AppSettings) -> Result<()> {
        for entry in &self.assets {
            let path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                base_dir.join(&entry.path)
            };
            let mime_type = mime_for_path(&path)?;
            let data = std::fs::read(&path)
                .with_context(|| format!("failed to read asset {}", path.display()))?;
            let name = match &entry.name {
                Some(name) => name.clone(),
                None => suggest_asset_name(
                    &path.file_name().unwrap_or_default().to_string_lossy(),
                ),
            };
            let asset = settings
                .add_asset(&name, entry.kind, mime_type, Bytes::from(data))
                .with_context(|| format!("cannot add asset from {}", path.display()))?;
            info!(name = %asset.name, kind = %asset.kind, bytes = asset.data.len(), "asset loaded");
        }

        if let Some(engine) = self.engine {
            settings.engine = engine;
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            settings.aspect_ratio = aspect_ratio;
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(delay) = self.delay_secs {
            settings.delay_secs = delay;
        }
        if let Some(prefix) = self.file_prefix {
            settings.file_prefix = prefix;
        }
        if let Some(name) = &self.character {
            select_by_name(settings, name, AssetKind::Character)?;
        }
        if let Some(name) = &self.context {
            select_by_name(settings, name, AssetKind::Context)?;
        }
        Ok(())
    }
}

/// Select the asset called `name` in its slot.
pub fn select_by_name(settings: &mut AppSettings, name: &str, kind: AssetKind) -> Result<()> {
    let Some(id) = settings.find_asset_by_name(name, kind).map(|a| a.id.clone()) else {
        bail!("no {kind} asset named '{name}'");
    };
    settings.select_asset(&id)?;
    Ok(())
}

fn mime_for_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    Ok(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => bail!("unsupported image type for {}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, bytes: &[u8]) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn loads_assets_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "refs/lucy.png", b"lucy");
        write(dir.path(), "refs/Max Portrait.JPG", b"max");
        write(dir.path(), "refs/city.webp", b"city");
        write(
            dir.path(),
            "reelsmith.toml",
            br#"
engine = "flash"
aspect_ratio = "9:16"
resolution = "1080p"
delay_secs = 3
character = "lucy"

[[assets]]
name = "Lucy"
kind = "character"
path = "refs/lucy.png"

[[assets]]
kind = "character"
path = "refs/Max Portrait.JPG"

[[assets]]
kind = "context"
path = "refs/city.webp"
"#,
        );

        let file = SettingsFile::load(&dir.path().join("reelsmith.toml")).unwrap();
        let mut settings = AppSettings::default();
        file.apply(dir.path(), &mut settings).unwrap();

        assert_eq!(settings.engine, ImageEngine::Flash);
        assert_eq!(settings.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(settings.resolution, Resolution::FullHd);
        assert_eq!(settings.delay_secs, 3);
        assert_eq!(settings.assets.len(), 3);
        assert_eq!(settings.assets[1].name, "MaxPortrait");
        assert_eq!(settings.assets[1].mime_type, "image/jpeg");
        assert_eq!(settings.selected_character().unwrap().name, "Lucy");
        assert_eq!(settings.selected_context().unwrap().mime_type, "image/webp");
        assert_eq!(settings.base_name(), "Lucy");
    }

    #[test]
    fn unknown_selection_and_type_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", b"hello");

        let file: SettingsFile = toml::from_str(
            r#"
[[assets]]
kind = "context"
path = "notes.txt"
"#,
        )
        .unwrap();
        let err = file.apply(dir.path(), &mut AppSettings::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported image type"));

        let file: SettingsFile = toml::from_str(r#"character = "ghost""#).unwrap();
        let err = file.apply(dir.path(), &mut AppSettings::default()).unwrap_err();
        assert!(err.to_string().contains("no character asset named 'ghost'"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<SettingsFile>("colour = \"red\"").is_err());
    }
}
