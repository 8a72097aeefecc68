//! Configuration management for the shikayat service.
//!
//! Loads settings from /etc/shikayat/config.toml (overridable with the
//! SHIKAYAT_CONFIG environment variable) or falls back to defaults. The
//! severity/department mapping lives here as deployment-time data, not
//! hardcoded logic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/shikayat/config.toml";

/// LLM backend configuration (Groq or any OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_enabled() -> bool {
    true
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_llm_timeout() -> u64 {
    20
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Hosted image-captioning model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSettings {
    #[serde(default = "default_caption_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_caption_timeout")]
    pub timeout_secs: u64,
}

fn default_caption_endpoint() -> String {
    "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-base"
        .to_string()
}

fn default_caption_timeout() -> u64 {
    30
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_caption_endpoint(),
            api_key: None,
            timeout_secs: default_caption_timeout(),
        }
    }
}

/// Hosted speech-to-text settings (Whisper over the Groq audio API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeSettings {
    #[serde(default = "default_transcribe_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_transcribe_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_transcribe_timeout")]
    pub timeout_secs: u64,
}

fn default_transcribe_endpoint() -> String {
    "https://api.groq.com/openai/v1/audio/transcriptions".to_string()
}

fn default_transcribe_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_transcribe_timeout() -> u64 {
    30
}

impl Default for TranscribeSettings {
    fn default() -> Self {
        Self {
            endpoint: default_transcribe_endpoint(),
            model: default_transcribe_model(),
            api_key: None,
            timeout_secs: default_transcribe_timeout(),
        }
    }
}

/// Email/SMS notification settings (SendGrid-style HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_notify_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_endpoint() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

fn default_sender_email() -> String {
    "noreply@shikayat.pk".to_string()
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_notify_endpoint(),
            api_key: None,
            sender_email: default_sender_email(),
            timeout_secs: default_notify_timeout(),
        }
    }
}

/// Geocoding settings (Nominatim-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeSettings {
    #[serde(default = "default_geocode_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
}

fn default_geocode_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocode_timeout() -> u64 {
    10
}

impl Default for GeocodeSettings {
    fn default() -> Self {
        Self {
            endpoint: default_geocode_endpoint(),
            timeout_secs: default_geocode_timeout(),
        }
    }
}

/// Daemon server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7180".to_string()
}

fn default_db_path() -> String {
    "/var/lib/shikayat/complaints.db".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
        }
    }
}

/// One enrichment override row in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentOverride {
    pub severity: String,
    pub department: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShikayatConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default = "default_tracking_prefix")]
    pub tracking_prefix: String,

    #[serde(default = "default_districts")]
    pub districts: Vec<String>,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub caption: CaptionSettings,

    #[serde(default)]
    pub transcribe: TranscribeSettings,

    #[serde(default)]
    pub notify: NotifySettings,

    #[serde(default)]
    pub geocode: GeocodeSettings,

    /// Keys are issue-type labels ("Water Leak", ...). Entries override the
    /// built-in severity/department table; missing entries keep defaults.
    #[serde(default)]
    pub enrichment: HashMap<String, EnrichmentOverride>,
}

fn default_tracking_prefix() -> String {
    "CIV".to_string()
}

fn default_districts() -> Vec<String> {
    [
        "Lahore",
        "Faisalabad",
        "Multan",
        "Gujranwala",
        "Sialkot",
        "Okara",
        "Sargodha",
        "Bahawalpur",
        "Jhang",
        "Gujrat",
        "Rawalpindi",
        "Islamabad",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl ShikayatConfig {
    /// Load configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = std::env::var("SHIKAYAT_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ShikayatConfig>(&contents) {
                Ok(mut config) => {
                    info!("Loaded config from {}", path.display());
                    config.apply_env_overrides();
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    let mut config = ShikayatConfig::seeded_default();
                    config.apply_env_overrides();
                    config
                }
            },
            Err(_) => {
                info!("No config at {}, using defaults", path.display());
                let mut config = ShikayatConfig::seeded_default();
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Defaults with serde default fields populated (Default derive leaves
    /// `tracking_prefix` and `districts` empty).
    pub fn seeded_default() -> Self {
        Self {
            tracking_prefix: default_tracking_prefix(),
            districts: default_districts(),
            ..Default::default()
        }
    }

    /// API keys come from the environment when not set in the file.
    fn apply_env_overrides(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("GROQ_API_KEY").ok();
        }
        if self.transcribe.api_key.is_none() {
            self.transcribe.api_key = std::env::var("GROQ_API_KEY").ok();
        }
        if self.notify.api_key.is_none() {
            self.notify.api_key = std::env::var("SENDGRID_API_KEY").ok();
        }
        if self.tracking_prefix.is_empty() {
            self.tracking_prefix = default_tracking_prefix();
        }
        if self.districts.is_empty() {
            self.districts = default_districts();
        }
    }
}
