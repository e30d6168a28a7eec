//! ANU quantum random number backend, used by the red-or-black command.

use crate::error::BackendError;
use serde::Deserialize;

const QRNG_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php";

#[derive(Deserialize)]
struct QrngResponse {
    #[serde(default)]
    data: Vec<u16>,
}

/// A roulette pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Red,
    Black,
}

impl Pick {
    /// uint8 ranges 0-255; the upper half picks black.
    pub fn from_sample(sample: u16) -> Self {
        if sample > 127 { Pick::Black } else { Pick::Red }
    }

    pub fn label(self) -> &'static str {
        match self {
            Pick::Red => "RED",
            Pick::Black => "BLACK",
        }
    }
}

pub struct QrngClient {
    http: reqwest::Client,
}

impl QrngClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn pick(&self) -> Result<Pick, BackendError> {
        let response = self
            .http
            .get(QRNG_URL)
            .query(&[("length", "1"), ("type", "uint8")])
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

        let parsed: QrngResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let sample = parsed
            .data
            .first()
            .copied()
            .ok_or_else(|| BackendError::Malformed("QRNG did not return a number".into()))?;
        Ok(Pick::from_sample(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::Pick;

    #[test]
    fn sample_split_at_midpoint() {
        assert_eq!(Pick::from_sample(0), Pick::Red);
        assert_eq!(Pick::from_sample(127), Pick::Red);
        assert_eq!(Pick::from_sample(128), Pick::Black);
        assert_eq!(Pick::from_sample(255), Pick::Black);
    }
}
