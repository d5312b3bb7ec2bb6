use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reelsmith_core::assets::AssetKind;
use reelsmith_core::settings::{AppSettings, AspectRatio, ImageEngine, Resolution};
use reelsmith_core::PROMPT_TEMPLATES;
use tokio::io::AsyncReadExt;

use crate::settings_file::{select_by_name, SettingsFile};

#[derive(Debug, Parser)]
#[command(name = "reelsmith", version, args_conflicts_with_subcommands = true)]
#[command(about = "Batch prompt → image → video generation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the built-in prompt templates
    Templates,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Prompt file, one `<image prompt> | <video prompt>` per line; `-` reads stdin
    pub prompts: Option<PathBuf>,

    /// TOML settings file with generation settings and reference assets
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Use built-in template N (see `reelsmith templates`) instead of a file
    #[arg(short, long, conflicts_with = "prompts")]
    pub template: Option<usize>,

    /// Image engine: `pro` or `flash`
    #[arg(long)]
    pub engine: Option<ImageEngine>,

    /// `16:9`, `1:1` or `9:16`
    #[arg(long)]
    pub aspect_ratio: Option<AspectRatio>,

    /// `720p` or `1080p`
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Seconds to wait after each image and between tasks
    #[arg(long)]
    pub delay: Option<u64>,

    /// File name prefix when no character is selected
    #[arg(long)]
    pub prefix: Option<String>,

    /// Select the character asset with this name
    #[arg(long)]
    pub character: Option<String>,

    /// Select the context asset with this name
    #[arg(long)]
    pub context: Option<String>,
}

impl RunArgs {
    /// Settings file first, then command-line overrides.
    pub fn build_settings(&self) -> Result<AppSettings> {
        let mut settings = AppSettings::default();
        if let Some(path) = &self.settings {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            SettingsFile::load(path)?.apply(base_dir, &mut settings)?;
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
        if let Some(delay) = self.delay {
            settings.delay_secs = delay;
        }
        if let Some(prefix) = &self.prefix {
            settings.file_prefix = prefix.clone();
        }
        if let Some(name) = &self.character {
            select_by_name(&mut settings, name, AssetKind::Character)?;
        }
        if let Some(name) = &self.context {
            select_by_name(&mut settings, name, AssetKind::Context)?;
        }
        Ok(settings)
    }

    pub async fn read_prompt_text(&self) -> Result<String> {
        if let Some(n) = self.template {
            let Some((_, line)) = n.checked_sub(1).and_then(|i| PROMPT_TEMPLATES.get(i)) else {
                bail!("template {n} does not exist (1..={})", PROMPT_TEMPLATES.len());
            };
            return Ok((*line).to_owned());
        }

        match self.prompts.as_deref() {
            Some(path) if path == Path::new("-") => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .context("failed to read prompts from stdin")?;
                Ok(text)
            }
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read prompt file {}", path.display())),
            None => bail!("no prompts given; pass a prompt file, `-` for stdin, or --template"),
        }
    }
}
