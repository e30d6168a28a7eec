//! Attachment relay: fetch inbound media and re-encode it as base64 inline
//! parts for the generative backend. Unsupported types and failed downloads
//! are skipped silently — the prompt still goes through without them.

use crate::backends::gemini::InlineData;
use base64::Engine as _;
use serenity::all::{CommandInteraction, Message, ResolvedValue};

/// Content types the generative backend accepts inline.
pub fn is_relayable(content_type: &str) -> bool {
    ["image/", "video/", "audio/"].iter().any(|p| content_type.starts_with(p))
        || content_type.starts_with("application/pdf")
}

/// Download one attachment and re-encode it, if its type is relayable.
pub async fn fetch_inline(
    http: &reqwest::Client,
    url: &str,
    content_type: Option<&str>,
) -> Option<InlineData> {
    let mime = content_type?;
    if !is_relayable(mime) {
        return None;
    }

    let response = match http.get(url).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::debug!(status = r.status().as_u16(), "attachment fetch failed");
            return None;
        }
        Err(e) => {
            tracing::debug!(error = %e, "attachment fetch failed");
            return None;
        }
    };

    let bytes = response.bytes().await.ok()?;
    Some(InlineData {
        // Strip any "; charset=..." parameters.
        mime_type: mime.split(';').next().unwrap_or(mime).trim().to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}

/// Relay every eligible attachment on a message.
pub async fn from_message(http: &reqwest::Client, msg: &Message) -> Vec<InlineData> {
    let mut parts = Vec::new();
    for attachment in &msg.attachments {
        if let Some(part) =
            fetch_inline(http, &attachment.url, attachment.content_type.as_deref()).await
        {
            parts.push(part);
        }
    }
    parts
}

/// Relay every attachment-typed option on a slash command.
pub async fn from_command(http: &reqwest::Client, cmd: &CommandInteraction) -> Vec<InlineData> {
    let mut parts = Vec::new();
    for option in cmd.data.options() {
        if let ResolvedValue::Attachment(attachment) = option.value
            && let Some(part) =
                fetch_inline(http, &attachment.url, attachment.content_type.as_deref()).await
        {
            parts.push(part);
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::is_relayable;

    #[test]
    fn relayable_types() {
        assert!(is_relayable("image/png"));
        assert!(is_relayable("video/mp4"));
        assert!(is_relayable("audio/ogg"));
        assert!(is_relayable("application/pdf"));
        assert!(!is_relayable("application/zip"));
        assert!(!is_relayable("text/plain"));
    }
}
