//! Gemini generative-language backend with credential rotation.
//!
//! Each request shuffles the configured key pool and rotates on 429 until a
//! key succeeds or the pool is exhausted. Any other non-success status is
//! surfaced verbatim — a broken request will fail identically on every key,
//! so rotating would only burn quota.

use crate::config::GeminiConfig;
use crate::error::PoolError;
use crate::pool::{self, Attempt, RetryPolicy};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// One inline media part forwarded to the model.
#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Serialize)]
struct GenerateRequest {
    system_instruction: Instruction,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// First candidate's first text part, if the model produced one.
    fn text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

/// Gemini client over a rotating credential pool.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    policy: RetryPolicy,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config, policy: RetryPolicy::Statuses(vec![429]) }
    }

    pub fn has_keys(&self) -> bool {
        !self.config.keys.is_empty()
    }

    /// Generate a completion for `prompt` under `system`, with optional
    /// inline attachments.
    pub async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        attachments: Vec<InlineData>,
    ) -> Result<String, PoolError> {
        let mut parts = vec![Part::Text { text: prompt.to_string() }];
        parts.extend(attachments.into_iter().map(|inline_data| Part::Inline { inline_data }));

        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: vec![Part::Text { text: system.to_string() }],
            },
            contents: vec![Content { parts }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        // StdRng rather than ThreadRng: the rng lives inside the pool future,
        // which must stay Send for the gateway handler.
        let mut rng = StdRng::from_os_rng();
        pool::run_pool(&self.config.keys, &mut rng, |key| {
            let http = self.http.clone();
            let url = url.clone();
            let body = &body;
            let policy = &self.policy;
            async move {
                let response = match http
                    .post(&url)
                    .query(&[("key", key.as_str())])
                    .json(body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => return Attempt::Unreachable(e.to_string()),
                };

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>()
                        .into_iter().rev().collect();
                    tracing::debug!(status = status.as_u16(), key_tail = %tail, "gemini key failed");
                    return policy.classify(status.as_u16(), super::error_text(&text));
                }

                match response.json::<GenerateResponse>().await {
                    Ok(parsed) => Attempt::Success(
                        parsed
                            .text()
                            .unwrap_or_else(|| "The model returned an empty response.".into()),
                    ),
                    Err(e) => Attempt::Unreachable(format!("failed to read response body: {e}")),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::GenerateResponse;
    use indoc::indoc;

    #[test]
    fn extracts_first_candidate_text() {
        let raw = indoc! {r#"
            {
              "candidates": [
                {"content": {"parts": [{"text": "hello there"}]}}
              ]
            }
        "#};
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("hello there"));
    }

    #[test]
    fn empty_candidates_yield_none() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
        assert!(parsed.text().is_none());
    }
}
