//! HTTP backend clients.
//!
//! One client per external API, all sharing a single `reqwest::Client` with
//! the configured timeout. Pool-shaped backends (Gemini credentials,
//! AUTOMATIC1111 hosts, LM Studio hosts) rotate through their targets via
//! `crate::pool`; the rest are single-endpoint.

pub mod auto1111;
pub mod gemini;
pub mod lmstudio;
pub mod qrng;
pub mod shodan;
pub mod translate;

use crate::config::Config;
use crate::error::Result;
use anyhow::Context as _;

/// All backend clients, constructed once at startup.
pub struct Backends {
    pub gemini: gemini::GeminiClient,
    pub chat: lmstudio::ChatPool,
    pub image: auto1111::ImagePool,
    pub shodan: Option<shodan::ShodanClient>,
    pub translate: translate::TranslateClient,
    pub qrng: qrng::QrngClient,
    http: reqwest::Client,
}

impl Backends {
    pub fn new(config: &Config) -> Result<Self> {
        // Shared connection pool; every backend call inherits the explicit
        // timeout instead of the transport default.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            gemini: gemini::GeminiClient::new(http.clone(), config.gemini.clone()),
            chat: lmstudio::ChatPool::new(http.clone(), config.chat_hosts.clone()),
            image: auto1111::ImagePool::new(http.clone(), config.image_hosts.clone()),
            shodan: config
                .shodan_key
                .as_ref()
                .map(|key| shodan::ShodanClient::new(http.clone(), key.clone())),
            translate: translate::TranslateClient::new(http.clone(), config.translate_url.clone()),
            qrng: qrng::QrngClient::new(http.clone()),
            http,
        })
    }

    /// Shared HTTP client, for ad-hoc fetches like the attachment relay.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Extract the most useful error text from a non-success response body:
/// the JSON `error.message` / `error` / `message` field when present,
/// otherwise the raw body.
pub(crate) fn error_text(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for text in [
            value.pointer("/error/message").and_then(|v| v.as_str()),
            value.get("error").and_then(|v| v.as_str()),
            value.get("message").and_then(|v| v.as_str()),
        ]
        .into_iter()
        .flatten()
        {
            return text.to_string();
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::error_text;

    #[test]
    fn prefers_nested_error_message() {
        assert_eq!(
            error_text(r#"{"error":{"message":"quota exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(error_text(r#"{"error":"no key"}"#), "no key");
        assert_eq!(error_text(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_text("plain text body\n"), "plain text body");
    }
}
