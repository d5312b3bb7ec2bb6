//! Reference images and per-task reference resolution.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::runtime::types::Task;
use crate::settings::AppSettings;

/// Characters can be detected by name in a prompt; contexts are only ever
/// used when explicitly selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Character,
    Context,
}

/// A named reference image held entirely in memory.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    pub mime_type: String,
    pub data: Bytes,
}

impl Asset {
    pub fn new(
        name: impl Into<String>,
        kind: AssetKind,
        mime_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn reference(&self) -> ReferenceImage {
        ReferenceImage {
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// Image payload attached to an image-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Output of [`resolve`]: references in `[character, context]` order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    pub images: Vec<ReferenceImage>,
    /// Name of the character used, for log lines.
    pub character_name: Option<String>,
}

/// Pick the reference images that accompany `task`'s image stage.
///
/// A character named in the prompt (case-insensitive substring) wins over the
/// selected character. The selected context is appended independently.
pub fn resolve(task: &Task, settings: &AppSettings) -> ResolvedReferences {
    resolve_prompt(&task.image_prompt, settings)
}

pub fn resolve_prompt(prompt: &str, settings: &AppSettings) -> ResolvedReferences {
    let lowered = prompt.to_lowercase();
    let mentioned = settings.assets.iter().find(|a| {
        a.kind == AssetKind::Character
            && !a.name.is_empty()
            && lowered.contains(&a.name.to_lowercase())
    });

    let mut resolved = ResolvedReferences::default();
    if let Some(character) = mentioned.or_else(|| settings.selected_character()) {
        resolved.images.push(character.reference());
        resolved.character_name = Some(character.name.clone());
    }
    if let Some(context) = settings.selected_context() {
        resolved.images.push(context.reference());
    }

    debug!(
        references = resolved.images.len(),
        character = resolved.character_name.as_deref().unwrap_or(""),
        "resolved reference images"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> (AppSettings, String, String, String) {
        let mut settings = AppSettings::default();
        let lucy = settings
            .add_asset("Lucy", AssetKind::Character, "image/png", Bytes::from_static(b"lucy"))
            .unwrap()
            .id
            .clone();
        let max = settings
            .add_asset("Max", AssetKind::Character, "image/jpeg", Bytes::from_static(b"max"))
            .unwrap()
            .id
            .clone();
        let city = settings
            .add_asset("city", AssetKind::Context, "image/png", Bytes::from_static(b"city"))
            .unwrap()
            .id
            .clone();
        (settings, lucy, max, city)
    }

    #[test]
    fn prompt_mention_beats_selected_character() {
        let (mut settings, _lucy, max, _city) = library();
        settings.selected_character_id = Some(max);
        settings.selected_context_id = None;

        let resolved = resolve_prompt("lucy smiles at the camera", &settings);
        assert_eq!(resolved.character_name.as_deref(), Some("Lucy"));
        assert_eq!(resolved.images.len(), 1);
        assert_eq!(resolved.images[0].data, Bytes::from_static(b"lucy"));
    }

    #[test]
    fn falls_back_to_selected_character_and_appends_context() {
        let (settings, ..) = library();

        let resolved = resolve_prompt("a quiet street", &settings);
        assert_eq!(resolved.character_name.as_deref(), Some("Max"));
        let payloads: Vec<_> = resolved.images.iter().map(|r| r.data.clone()).collect();
        assert_eq!(
            payloads,
            vec![Bytes::from_static(b"max"), Bytes::from_static(b"city")]
        );
        assert_eq!(resolved.images[0].mime_type, "image/jpeg");
    }

    #[test]
    fn contexts_are_never_detected_from_the_prompt() {
        let (mut settings, ..) = library();
        settings.selected_character_id = None;
        settings.selected_context_id = None;

        let resolved = resolve_prompt("a city at night", &settings);
        assert!(resolved.images.is_empty());
        assert_eq!(resolved.character_name, None);
    }

    #[test]
    fn dangling_selection_resolves_to_nothing() {
        let settings = AppSettings {
            selected_character_id: Some("gone".to_owned()),
            selected_context_id: Some("gone-too".to_owned()),
            ..Default::default()
        };
        let resolved = resolve_prompt("anything", &settings);
        assert!(resolved.images.is_empty());
    }
}
