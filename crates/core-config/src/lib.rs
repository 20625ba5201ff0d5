//! Configuration loading and parsing.
//!
//! Parses `quillcheck.toml` (or an override path supplied by the host)
//! into the typed option set every other crate consumes. Unknown fields are
//! ignored (TOML deserialization tolerance) so the file can grow without
//! breaking older builds, and a malformed file falls back to defaults
//! rather than refusing to start: a checker with stock settings beats no
//! checker at all.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Checker language selection: auto-detect or one of the fixed codes the
/// remote service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "de-DE")]
    DeDe,
    #[serde(rename = "fr")]
    Fr,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "it")]
    It,
    #[serde(rename = "nl")]
    Nl,
    #[serde(rename = "pt-PT")]
    PtPt,
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "pl-PL")]
    PlPl,
    #[serde(rename = "ru-RU")]
    RuRu,
    #[serde(rename = "sv")]
    Sv,
}

impl Language {
    /// Wire value for the `language` form field.
    pub fn as_code(&self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::EnUs => "en-US",
            Language::EnGb => "en-GB",
            Language::DeDe => "de-DE",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::It => "it",
            Language::Nl => "nl",
            Language::PtPt => "pt-PT",
            Language::PtBr => "pt-BR",
            Language::PlPl => "pl-PL",
            Language::RuRu => "ru-RU",
            Language::Sv => "sv",
        }
    }
}

/// Visual treatment of the annotation markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnderlineStyle {
    #[default]
    Wavy,
    Solid,
    Dotted,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_true")]
    pub enabled: bool,
    /// Base URL of the checking service; normalized by the check client.
    #[serde(default = "Config::default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub use_custom_server: bool,
    /// Optional premium key, sent only when present.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "Config::default_true")]
    pub show_style_suggestions: bool,
    #[serde(default = "Config::default_true")]
    pub check_grammar: bool,
    #[serde(default = "Config::default_true")]
    pub check_spelling: bool,
    /// Quiet window after the last edit before a check fires.
    #[serde(default = "Config::default_debounce_ms")]
    pub debounce_ms: u64,
    /// Texts longer than this (in chars) are not checked at all.
    #[serde(default = "Config::default_max_characters")]
    pub max_characters: usize,
    #[serde(default = "Config::default_true")]
    pub enable_in_dms: bool,
    #[serde(default = "Config::default_true")]
    pub enable_in_servers: bool,
    #[serde(default)]
    pub underline_style: UnderlineStyle,
    #[serde(default = "Config::default_true")]
    pub disable_native_spellcheck: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            api_endpoint: Self::default_api_endpoint(),
            use_custom_server: false,
            api_key: None,
            language: Language::default(),
            show_style_suggestions: true,
            check_grammar: true,
            check_spelling: true,
            debounce_ms: Self::default_debounce_ms(),
            max_characters: Self::default_max_characters(),
            enable_in_dms: true,
            enable_in_servers: true,
            underline_style: UnderlineStyle::default(),
            disable_native_spellcheck: true,
        }
    }
}

impl Config {
    const fn default_true() -> bool {
        true
    }
    fn default_api_endpoint() -> String {
        "https://api.languagetool.org".to_string()
    }
    const fn default_debounce_ms() -> u64 {
        600
    }
    const fn default_max_characters() -> usize {
        2000
    }
}

/// Best-effort config path: local working directory first, then the
/// platform config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("quillcheck.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("quillcheck").join("quillcheck.toml");
    }
    PathBuf::from("quillcheck.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<Config>(&content) {
            Ok(cfg) => {
                info!(
                    target: "config",
                    path = %path.display(),
                    enabled = cfg.enabled,
                    custom_server = cfg.use_custom_server,
                    debounce_ms = cfg.debounce_ms,
                    "config_loaded"
                );
                Ok(cfg)
            }
            Err(e) => {
                warn!(
                    target: "config",
                    path = %path.display(),
                    error = %e,
                    "config_parse_failed_using_defaults"
                );
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}
