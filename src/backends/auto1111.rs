//! AUTOMATIC1111 image-generation pool.
//!
//! Same fallback policy as the chat pool: every failure rotates to the next
//! host. A successful response carries the image base64-encoded; it is
//! decoded here so callers only ever see bytes.

use crate::error::PoolError;
use crate::pool::{self, Attempt, RetryPolicy};
use base64::Engine as _;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Generation parameters. Defaults mirror the deployed bot's house style.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub cfg_scale: f32,
    pub steps: u32,
    pub sampler_index: String,
    pub restore_faces: bool,
    pub width: u32,
    pub height: u32,
}

pub const DEFAULT_NEGATIVE_PROMPT: &str = "lowres, text, error, cropped, worst quality, \
    low quality, jpeg artifacts, ugly, duplicate, morbid, mutilated, out of frame, \
    extra fingers, mutated hands, poorly drawn hands, poorly drawn face, mutation, \
    deformed, blurry, bad anatomy, bad proportions, extra limbs, cloned face, \
    disfigured, gross proportions, malformed limbs, missing arms, missing legs, \
    extra arms, extra legs, fused fingers, too many fingers, long neck, username, \
    watermark, signature";

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.into(),
            cfg_scale: 7.0,
            steps: 35,
            sampler_index: "Euler a".into(),
            restore_faces: false,
            width: 672,
            height: 672,
        }
    }
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Image-generation client over a host pool.
pub struct ImagePool {
    http: reqwest::Client,
    hosts: Vec<String>,
    policy: RetryPolicy,
}

impl ImagePool {
    pub fn new(http: reqwest::Client, hosts: Vec<String>) -> Self {
        Self { http, hosts, policy: RetryPolicy::AllStatuses }
    }

    /// Generate one image; returns the decoded PNG bytes.
    pub async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, PoolError> {
        let mut rng = StdRng::from_os_rng();
        pool::run_pool(&self.hosts, &mut rng, |host| {
            let http = self.http.clone();
            let policy = &self.policy;
            async move {
                let url = format!("{}/sdapi/v1/txt2img", host.trim_end_matches('/'));
                let response = match http.post(&url).json(request).send().await {
                    Ok(r) => r,
                    Err(e) => return Attempt::Unreachable(format!("{host}: {e}")),
                };

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return policy.classify(status.as_u16(), super::error_text(&text));
                }

                let parsed = match response.json::<ImageResponse>().await {
                    Ok(p) => p,
                    Err(e) => return Attempt::Unreachable(format!("{host}: bad response body: {e}")),
                };

                let Some(encoded) = parsed.images.into_iter().next() else {
                    return Attempt::Unreachable(format!("{host}: no image in response"));
                };

                match base64::engine::general_purpose::STANDARD.decode(encoded) {
                    Ok(bytes) => Attempt::Success(bytes),
                    Err(e) => Attempt::Unreachable(format!("{host}: image decode failed: {e}")),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NEGATIVE_PROMPT, ImageRequest};

    #[test]
    fn defaults_match_house_style() {
        let req = ImageRequest::new("a cat");
        assert_eq!(req.width, 672);
        assert_eq!(req.height, 672);
        assert_eq!(req.steps, 35);
        assert_eq!(req.sampler_index, "Euler a");
        assert_eq!(req.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
        assert!(!req.restore_faces);
    }
}
