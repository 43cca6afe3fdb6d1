use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{SectionQuery, Semester};

const DEFAULT_SCHOOL_ID: &str = "U2Nob29sLTE2Mg==";
/// One year; anything longer is clamped.
const MAX_STALE_MINUTES: u64 = 60 * 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub supabase_url: String,
    pub api_key: String,
    /// Minutes before a cached result set is refetched in the background.
    #[serde(default = "default_stale_minutes")]
    pub stale_minutes: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_school_id")]
    pub ratings_school_id: String,
    /// Query shown at startup; CLI flags override individual fields.
    #[serde(default)]
    pub default_query: SectionQuery,
}

fn default_stale_minutes() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

fn default_school_id() -> String {
    DEFAULT_SCHOOL_ID.into()
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config at {}", path.display()))?;
                return Self::parse(&contents);
            }
        }

        let supabase_url = std::env::var("SUPABASE_URL")
            .with_context(|| "SUPABASE_URL not set. Create a config file or set the env var.")?;
        let api_key = std::env::var("SUPABASE_ANON_KEY").with_context(|| {
            "SUPABASE_ANON_KEY not set. Create a config file or set the env var."
        })?;

        Ok(Self {
            supabase_url,
            api_key,
            default_query: SectionQuery::default(),
            stale_minutes: default_stale_minutes(),
            log_level: default_log_level(),
            ratings_school_id: default_school_id(),
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).with_context(|| "Failed to parse config.toml")
    }

    pub fn generate_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .with_context(|| "Could not determine config directory")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let default = Config {
            supabase_url: "https://your-project.supabase.co".into(),
            api_key: "your-anon-key-here".into(),
            default_query: SectionQuery::new(Semester::Fall, 2024, "", ""),
            stale_minutes: default_stale_minutes(),
            log_level: default_log_level(),
            ratings_school_id: default_school_id(),
        };

        let toml_str = toml::to_string_pretty(&default)?;
        std::fs::write(&path, toml_str)?;
        Ok(path)
    }

    /// Staleness window for cached result sets, clamped to a year.
    pub fn stale_after(&self) -> chrono::Duration {
        let minutes = self.stale_minutes.min(MAX_STALE_MINUTES) as i64;
        chrono::Duration::try_minutes(minutes).unwrap_or(chrono::Duration::minutes(60))
    }

    /// Parsed `log_level`, falling back to `info` on nonsense.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("section-picker").join("config.toml"))
    }

    pub fn log_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("section-picker").join("section-picker.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let cfg = Config::parse(
            r#"
            supabase_url = "https://x.supabase.co"
            api_key = "k"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stale_minutes, 60);
        assert_eq!(cfg.stale_after(), chrono::Duration::minutes(60));
        assert_eq!(cfg.tracing_level(), tracing::Level::INFO);
        assert!(!cfg.default_query.is_enabled());
        assert_eq!(cfg.ratings_school_id, DEFAULT_SCHOOL_ID);
    }

    #[test]
    fn full_file_round_trips() {
        let cfg = Config::parse(
            r#"
            supabase_url = "https://x.supabase.co"
            api_key = "k"
            stale_minutes = 5
            log_level = "debug"

            [default_query]
            semester = "spring"
            year = 2025
            dept = "MATH"
            course_number = "241"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.default_query.semester, Semester::Spring);
        assert!(cfg.default_query.is_enabled());
        assert_eq!(cfg.tracing_level(), tracing::Level::DEBUG);

        let again = Config::parse(&toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(again.default_query, cfg.default_query);
    }

    #[test]
    fn huge_stale_window_is_clamped() {
        let cfg = Config::parse(
            r#"
            supabase_url = "https://x.supabase.co"
            api_key = "k"
            stale_minutes = 9223372036854775807
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.stale_after(),
            chrono::Duration::minutes(MAX_STALE_MINUTES as i64)
        );
    }
}
