//! Configuration loading and validation.
//!
//! Everything comes from the environment. Host pools and credential lists
//! are JSON-encoded string arrays (`AUTO1111_HOSTS='["http://a:7860", ...]'`)
//! so a deployment can swap pool membership without touching the binary.

use crate::error::{ConfigError, Result};
use anyhow::Context as _;

/// Nebulabot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token.
    pub discord_token: String,

    /// Gemini generative-language backend.
    pub gemini: GeminiConfig,

    /// AUTOMATIC1111 image-generation host pool.
    pub image_hosts: Vec<String>,

    /// LM Studio chat-completion host pool.
    pub chat_hosts: Vec<String>,

    /// Shodan API key, if host search is enabled.
    pub shodan_key: Option<String>,

    /// LibreTranslate base URL.
    pub translate_url: String,

    /// Timeout applied to every outbound HTTP request, in seconds.
    pub http_timeout_secs: u64,

    /// Keyword-triggered persona replies.
    pub trigger: TriggerConfig,
}

/// Gemini backend configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Credential pool. Each request rotates through these until one succeeds.
    pub keys: Vec<String>,

    /// API base URL.
    pub base_url: String,

    /// Model used for the explicit chat command.
    pub chat_model: String,

    /// Model used for keyword-triggered replies.
    pub trigger_model: String,
}

/// Keyword-trigger configuration for ambient persona replies.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Lowercased substrings that trigger a reply when found in a message.
    pub keywords: Vec<String>,

    /// System instruction for the persona. `{history}` is replaced with the
    /// recent channel transcript.
    pub persona: String,
}

const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TRANSLATE_URL: &str = "http://localhost:5000";
const DEFAULT_PERSONA: &str = "You are Nebula, a cheerful and slightly chaotic \
    member of this Discord server. Reply in first person, keep it to one short \
    paragraph, and stay in character.\n\nRecent channel history:\n\n{history}";

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| ConfigError::MissingKey("DISCORD_TOKEN".into()))?;

        // Gemini keys: a JSON list in GEMINI_KEYS, falling back to a single
        // GEMINI_KEY. An empty pool is allowed — the command reports it.
        let mut keys = json_list("GEMINI_KEYS")?;
        if keys.is_empty()
            && let Ok(single) = std::env::var("GEMINI_KEY")
        {
            keys.push(single);
        }

        let gemini = GeminiConfig {
            keys,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE.into()),
            chat_model: std::env::var("GEMINI_CHAT_MODEL")
                .unwrap_or_else(|_| "gemini-flash-latest".into()),
            trigger_model: std::env::var("GEMINI_TRIGGER_MODEL")
                .unwrap_or_else(|_| "gemini-flash-lite-latest".into()),
        };

        let http_timeout_secs = match std::env::var("NEBULABOT_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("NEBULABOT_HTTP_TIMEOUT_SECS: not a number: {raw}"))
            })?,
            Err(_) => 30,
        };
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid("NEBULABOT_HTTP_TIMEOUT_SECS must be nonzero".into()).into());
        }

        let trigger = TriggerConfig {
            keywords: {
                let words = json_list("NEBULABOT_TRIGGER_KEYWORDS")?;
                if words.is_empty() {
                    vec!["nebula".into()]
                } else {
                    words.into_iter().map(|w| w.to_lowercase()).collect()
                }
            },
            persona: std::env::var("NEBULABOT_PERSONA").unwrap_or_else(|_| DEFAULT_PERSONA.into()),
        };

        Ok(Self {
            discord_token,
            gemini,
            image_hosts: json_list("AUTO1111_HOSTS")?,
            chat_hosts: json_list("LMS_HOSTS")?,
            shodan_key: std::env::var("SHODAN_KEY").ok(),
            translate_url: std::env::var("LIBRETRANSLATE_URL")
                .unwrap_or_else(|_| DEFAULT_TRANSLATE_URL.into()),
            http_timeout_secs,
            trigger,
        })
    }
}

/// Parse an env var holding a JSON string array. Unset means empty.
fn json_list(key: &str) -> Result<Vec<String>> {
    match std::env::var(key) {
        Ok(raw) => {
            let list: Vec<String> = serde_json::from_str(&raw)
                .with_context(|| format!("{key} is not a JSON string array"))
                .map_err(ConfigError::Other)?;
            Ok(list)
        }
        Err(_) => Ok(Vec::new()),
    }
}
