//! LibreTranslate client.
//!
//! Failure semantics matter here: a non-200 from the service falls back to
//! the original text (the service rejects some inputs it can't translate),
//! while a transport error propagates so the rewrite filter can abort
//! without stamping a half-translated message.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Seam for the rewrite filter; tests substitute a mock.
#[async_trait]
pub trait Translate: Send + Sync {
    /// Translate English `text` into `target`. `Ok` with the original text
    /// means the service declined; `Err` means it was unreachable.
    async fn translate(&self, text: &str, target: &str) -> Result<String, BackendError>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

pub struct TranslateClient {
    http: reqwest::Client,
    base_url: String,
}

impl TranslateClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Raw call used by the one-shot command, which wants to report errors
    /// instead of degrading.
    pub async fn translate_strict(
        &self,
        text: &str,
        target: &str,
    ) -> Result<String, BackendError> {
        let url = format!("{}/translate", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&TranslateRequest { q: text, source: "en", target })
            .send()
            .await
            .map_err(BackendError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: super::error_text(&body),
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        parsed
            .translated_text
            .ok_or_else(|| BackendError::Malformed("no translatedText in response".into()))
    }
}

#[async_trait]
impl Translate for TranslateClient {
    async fn translate(&self, text: &str, target: &str) -> Result<String, BackendError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        match self.translate_strict(text, target).await {
            Ok(translated) => Ok(translated),
            // Service said no — degrade to the original text.
            Err(BackendError::Status { status, message }) => {
                tracing::debug!(status, message = %message, "translation declined, passing through");
                Ok(text.to_string())
            }
            Err(BackendError::Malformed(reason)) => {
                tracing::debug!(reason = %reason, "translation response malformed, passing through");
                Ok(text.to_string())
            }
            Err(err) => Err(err),
        }
    }
}
