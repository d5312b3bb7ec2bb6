//! Process configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the reelsmith CLI.
///
/// Everything except the API key has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key (`REELSMITH_API_KEY`). Runs refuse to start without one.
    pub api_key: Option<String>,

    /// API root (default: `"https://generativelanguage.googleapis.com"`).
    pub api_base: String,

    /// Video model override (`REELSMITH_VIDEO_MODEL`); the gateway default
    /// is used when unset.
    pub video_model: Option<String>,

    /// Directory downloads are written to (default: `"./output"`).
    pub output_dir: PathBuf,

    /// `tracing` filter string, e.g. `"info"` or `"reelsmith_core=debug"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Seconds between video operation status queries (default: 5).
    pub poll_interval_secs: u64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup("REELSMITH_API_KEY").filter(|k| !k.trim().is_empty()),
            api_base: env_or(&lookup, "REELSMITH_API_BASE", "https://generativelanguage.googleapis.com"),
            video_model: lookup("REELSMITH_VIDEO_MODEL").filter(|m| !m.trim().is_empty()),
            output_dir: PathBuf::from(env_or(&lookup, "REELSMITH_OUTPUT_DIR", "./output")),
            log_level: env_or(&lookup, "REELSMITH_LOG", "info"),
            log_json: lookup("REELSMITH_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll_interval_secs: parse_env(&lookup, "REELSMITH_POLL_INTERVAL_SECS", 5),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.video_model, None);
        assert_eq!(cfg.api_base, "https://generativelanguage.googleapis.com");
        assert_eq!(cfg.output_dir, PathBuf::from("./output"));
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.log_json);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn environment_overrides() {
        let cfg = config(&[
            ("REELSMITH_API_KEY", "secret"),
            ("REELSMITH_VIDEO_MODEL", "veo-3.1-generate-preview"),
            ("REELSMITH_OUTPUT_DIR", "/tmp/reels"),
            ("REELSMITH_LOG_JSON", "TRUE"),
            ("REELSMITH_POLL_INTERVAL_SECS", "12"),
        ]);
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.video_model.as_deref(), Some("veo-3.1-generate-preview"));
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/reels"));
        assert!(cfg.log_json);
        assert_eq!(cfg.poll_interval_secs, 12);
    }

    #[test]
    fn malformed_values_fall_back() {
        let cfg = config(&[
            ("REELSMITH_API_KEY", "  "),
            ("REELSMITH_POLL_INTERVAL_SECS", "soon"),
        ]);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.poll_interval_secs, 5);
    }
}
