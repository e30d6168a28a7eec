//! Self-hosted chat-completion pool (LM Studio, OpenAI-style API).
//!
//! Hosts are interchangeable; any non-200 or connection failure rotates to
//! the next host, and an exhausted pool reports every host offline.

use crate::error::PoolError;
use crate::pool::{self, Attempt, RetryPolicy};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "A chat between a curious user and a helpful \
    roleplay assistant called Wizard. Wizard stays in character, answers \
    playfully, and never refuses a harmless question.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: i32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn text(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.content
    }
}

/// Chat-completion client over a host pool.
pub struct ChatPool {
    http: reqwest::Client,
    hosts: Vec<String>,
    policy: RetryPolicy,
}

impl ChatPool {
    pub fn new(http: reqwest::Client, hosts: Vec<String>) -> Self {
        Self { http, hosts, policy: RetryPolicy::AllStatuses }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, PoolError> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.7,
            max_tokens: -1,
            stream: false,
        };

        let mut rng = StdRng::from_os_rng();
        pool::run_pool(&self.hosts, &mut rng, |host| {
            let http = self.http.clone();
            let body = &body;
            let policy = &self.policy;
            async move {
                let url = format!("{}/v1/chat/completions", host.trim_end_matches('/'));
                let response = match http.post(&url).json(body).send().await {
                    Ok(r) => r,
                    Err(e) => return Attempt::Unreachable(format!("{host}: {e}")),
                };

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return policy.classify(status.as_u16(), super::error_text(&text));
                }

                match response.json::<ChatResponse>().await {
                    Ok(parsed) => match parsed.text() {
                        Some(text) => Attempt::Success(text),
                        None => Attempt::Unreachable(format!("{host}: empty completion")),
                    },
                    Err(e) => Attempt::Unreachable(format!("{host}: bad response body: {e}")),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::ChatResponse;

    #[test]
    fn extracts_first_choice_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("hi"));
    }

    #[test]
    fn missing_choices_yield_none() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }
}
