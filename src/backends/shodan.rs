//! Shodan host-search backend.
//!
//! Responses are loosely-typed JSON in the wild; every field on a match is
//! optional here, with display accessors defaulting to "N/A" so rendering
//! never has to reason about missing data.

use crate::error::BackendError;
use base64::Engine as _;
use serde::Deserialize;

const SEARCH_PATH: &str = "/shodan/host/search";
pub const HOST_PAGE_URL: &str = "https://www.shodan.io/host";
const RESULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub matches: Vec<HostMatch>,
}

/// One matched service record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostMatch {
    pub ip_str: Option<String>,
    pub port: Option<u32>,
    pub org: Option<String>,
    pub isp: Option<String>,
    pub product: Option<String>,
    pub asn: Option<String>,
    pub transport: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    pub location: Option<Location>,
    pub screenshot: Option<Screenshot>,
    /// Raw service banner.
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Screenshot {
    /// Base64-encoded image.
    pub data: Option<String>,
    pub mime: Option<String>,
}

const NA: &str = "N/A";

impl HostMatch {
    pub fn ip(&self) -> &str {
        self.ip_str.as_deref().unwrap_or(NA)
    }

    pub fn port_display(&self) -> String {
        self.port.map_or_else(|| NA.into(), |p| p.to_string())
    }

    /// Organisation, falling back to the ISP.
    pub fn org_display(&self) -> &str {
        self.org
            .as_deref()
            .or(self.isp.as_deref())
            .unwrap_or(NA)
    }

    pub fn product_display(&self) -> &str {
        self.product.as_deref().unwrap_or(NA)
    }

    pub fn asn_display(&self) -> &str {
        self.asn.as_deref().unwrap_or(NA)
    }

    pub fn transport_display(&self) -> &str {
        self.transport.as_deref().unwrap_or(NA)
    }

    pub fn timestamp_display(&self) -> &str {
        self.timestamp.as_deref().unwrap_or(NA)
    }

    pub fn country_display(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.country_name.as_deref().or(l.country_code.as_deref()))
            .unwrap_or(NA)
    }

    pub fn region_display(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.region_code.as_deref().or(l.region_name.as_deref()))
            .unwrap_or(NA)
    }

    /// Short label for attachment filenames: city, else org, else "custom".
    pub fn filename_hint(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.city.as_deref())
            .or(self.org.as_deref())
            .unwrap_or("custom")
    }

    /// Decoded screenshot bytes and a file extension, when the record
    /// carries a decodable screenshot.
    pub fn decode_screenshot(&self) -> Option<(Vec<u8>, String)> {
        let shot = self.screenshot.as_ref()?;
        let encoded = shot.data.as_deref()?;
        let mime = shot.mime.as_deref().unwrap_or("image/jpeg");
        let ext = mime.rsplit('/').next().unwrap_or("jpeg").to_lowercase();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()?;
        Some((bytes, ext))
    }

    pub fn has_screenshot(&self) -> bool {
        self.decode_screenshot().is_some()
    }

    /// Raw banner text, if present and non-empty.
    pub fn banner(&self) -> Option<&str> {
        self.data.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Join up to `limit` items, appending a "(+N more)" tail past the cap.
pub fn safe_join(items: &[String], limit: usize) -> String {
    let trimmed: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if trimmed.is_empty() {
        return NA.into();
    }
    if trimmed.len() > limit {
        format!("{} (+{} more)", trimmed[..limit].join(", "), trimmed.len() - limit)
    } else {
        trimmed.join(", ")
    }
}

/// Build the canonical city-screenshot query.
pub fn city_screenshot_query(city: &str) -> String {
    format!("city:\"{city}\" has_screenshot:true")
}

/// Build the city + port filter query (filters AND by concatenation).
pub fn city_port_query(city: &str, port: u16) -> String {
    format!("city:\"{city}\" port:{port}")
}

/// Parse the `show:screenshot` / `show:list` display directives out of a raw
/// query. Returns the cleaned query and whether screenshot mode applies;
/// screenshot mode forces the `has_screenshot:true` filter into the query.
pub fn parse_query_directives(raw: &str) -> (String, bool) {
    let original = raw.trim();
    let lower = original.to_lowercase();

    let (base, screenshots) = if lower.contains("show:screenshot") {
        let cleaned = original
            .replace("show:screenshot", "")
            .replace("SHOW:SCREENSHOT", "");
        (cleaned, true)
    } else if lower.contains("show:list") {
        let cleaned = original.replace("show:list", "").replace("SHOW:LIST", "");
        (cleaned, false)
    } else {
        (original.to_string(), lower.contains("has_screenshot:true"))
    };

    let mut query = base.trim().to_string();
    if screenshots && !query.to_lowercase().contains("has_screenshot:true") {
        query = format!("{query} has_screenshot:true").trim().to_string();
    }
    (query, screenshots)
}

/// Shodan search client.
pub struct ShodanClient {
    http: reqwest::Client,
    base_url: String,
    key: String,
}

impl ShodanClient {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self { http, base_url: "https://api.shodan.io".into(), key }
    }

    /// Run a search, returning up to 100 matches.
    pub async fn search(&self, query: &str) -> Result<Vec<HostMatch>, BackendError> {
        let url = format!("{}{SEARCH_PATH}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.key.as_str()),
                ("query", query),
                ("limit", &RESULT_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(BackendError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: super::error_text(&text),
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(parsed.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::{HostMatch, SearchResponse, parse_query_directives, safe_join};
    use indoc::indoc;

    #[test]
    fn missing_fields_default_to_na() {
        let m: HostMatch = serde_json::from_str("{}").unwrap();
        assert_eq!(m.ip(), "N/A");
        assert_eq!(m.port_display(), "N/A");
        assert_eq!(m.org_display(), "N/A");
        assert_eq!(m.country_display(), "N/A");
        assert_eq!(m.filename_hint(), "custom");
        assert!(m.banner().is_none());
        assert!(!m.has_screenshot());
    }

    #[test]
    fn parses_full_match_record() {
        let raw = indoc! {r#"
            {
              "matches": [{
                "ip_str": "203.0.113.7",
                "port": 25565,
                "org": "Example Hosting",
                "asn": "AS64500",
                "hostnames": ["mc.example.net"],
                "domains": ["example.net"],
                "location": {"city": "Adelaide", "country_name": "Australia", "region_code": "SA"},
                "data": "§aMinecraft server",
                "screenshot": {"data": "aGVsbG8=", "mime": "image/png"}
              }]
            }
        "#};
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let m = &parsed.matches[0];
        assert_eq!(m.ip(), "203.0.113.7");
        assert_eq!(m.port_display(), "25565");
        assert_eq!(m.country_display(), "Australia");
        assert_eq!(m.region_display(), "SA");
        assert_eq!(m.filename_hint(), "Adelaide");
        let (bytes, ext) = m.decode_screenshot().unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ext, "png");
    }

    #[test]
    fn isp_backfills_org() {
        let m: HostMatch = serde_json::from_str(r#"{"isp":"Example ISP"}"#).unwrap();
        assert_eq!(m.org_display(), "Example ISP");
    }

    #[test]
    fn undecodable_screenshot_counts_as_no_media() {
        let m: HostMatch =
            serde_json::from_str(r#"{"screenshot":{"data":"%%%not-base64%%%"}}"#).unwrap();
        assert!(!m.has_screenshot());
    }

    #[test]
    fn safe_join_caps_and_annotates() {
        let items: Vec<String> =
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(safe_join(&items, 3), "a, b, c (+2 more)");
        assert_eq!(safe_join(&items[..2], 3), "a, b");
        assert_eq!(safe_join(&[], 3), "N/A");
        assert_eq!(safe_join(&["  ".into()], 3), "N/A");
    }

    #[test]
    fn display_directives() {
        let (q, shots) = parse_query_directives("apache show:screenshot");
        assert_eq!(q, "apache has_screenshot:true");
        assert!(shots);

        let (q, shots) = parse_query_directives("apache has_screenshot:true show:list");
        assert_eq!(q, "apache has_screenshot:true");
        assert!(!shots);

        let (q, shots) = parse_query_directives("nginx country:DE");
        assert_eq!(q, "nginx country:DE");
        assert!(!shots);

        let (q, shots) = parse_query_directives("webcam has_screenshot:true");
        assert_eq!(q, "webcam has_screenshot:true");
        assert!(shots);
    }
}
