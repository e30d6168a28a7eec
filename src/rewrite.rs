//! Self-message rewrite filters.
//!
//! When a channel has an active translation mode, the bot's own outgoing
//! messages (new and edited) are intercepted, run through the translation
//! backend part by part, stamped with a marker, and edited in place. The
//! marker is the sole idempotence signal: content already ending in any
//! known marker — or an embed footer carrying a known footer prefix — is
//! never rewritten again, which is what stops the filter from looping on
//! the edit events its own edits produce.
//!
//! Two instantiations of the same machine exist: "become" resolves its
//! target per channel from the language table, "japanese mode" is a fixed
//! target with its own marker. Detection checks the union of both filters'
//! markers so the two never re-process each other's output.

use crate::backends::translate::Translate;
use crate::error::BackendError;
use crate::modes::{ChannelModes, LANGUAGES, Language};
use std::sync::Arc;

/// Content suffix stamped by japanese mode. Deliberately not the 🇯🇵 flag the
/// language table uses, so the two filters' stamps stay distinguishable.
pub const JAPANESE_SUFFIX: &str = " ⛩️";

/// Embed footer stamped by japanese mode.
pub const JAPANESE_FOOTER: &str = "🇯🇵 JAPAN JAPAN JAPAN IT'S GREAT";

/// Footer prefix stamped by the become filter ("i'm french 🇫🇷").
const BECOME_FOOTER_PREFIX: &str = "i'm ";

/// Structured parts of one embed, platform-agnostic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedParts {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// What the filter needs to know about a message event.
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    /// Whether the bot itself authored the message.
    pub from_self: bool,
    pub channel_id: u64,
    pub content: String,
    pub embeds: Vec<EmbedParts>,
}

/// A resolved rewrite target: language code plus the strings stamped onto
/// the rewritten message.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteTarget {
    pub lang: String,
    pub suffix: String,
    pub footer: String,
}

/// Outcome of evaluating a message event.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteDecision {
    /// Not ours to touch (foreign author or unregistered channel).
    Ignored,
    /// Already carries a known marker; touching it again would loop.
    AlreadyRewritten,
    /// Transform and edit in place.
    Rewrite(RewriteTarget),
}

/// Replacement parts produced by a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenMessage {
    /// `None` when the original had no text content.
    pub content: Option<String>,
    pub embeds: Vec<EmbedParts>,
}

type ResolveFn = Box<dyn Fn(u64) -> Option<RewriteTarget> + Send + Sync>;

/// One parameterized rewrite state machine.
pub struct RewriteFilter {
    name: &'static str,
    known_suffixes: Vec<&'static str>,
    known_footer_prefixes: Vec<&'static str>,
    resolve: ResolveFn,
}

/// Every content marker either filter can stamp.
fn all_known_suffixes() -> Vec<&'static str> {
    let mut suffixes: Vec<&'static str> = LANGUAGES.iter().map(|l| l.marker).collect();
    suffixes.push(JAPANESE_SUFFIX);
    suffixes
}

/// The per-channel language filter.
pub fn become_filter(modes: Arc<ChannelModes<&'static Language>>) -> RewriteFilter {
    RewriteFilter {
        name: "become",
        known_suffixes: all_known_suffixes(),
        known_footer_prefixes: vec![BECOME_FOOTER_PREFIX, JAPANESE_FOOTER],
        resolve: Box::new(move |channel_id| {
            modes.get(channel_id).map(|lang| RewriteTarget {
                lang: lang.target.into(),
                suffix: lang.marker.into(),
                footer: format!("{BECOME_FOOTER_PREFIX}{}{}", lang.name, lang.marker),
            })
        }),
    }
}

/// The fixed-target japanese-mode filter.
pub fn japanese_filter(modes: Arc<ChannelModes<()>>) -> RewriteFilter {
    RewriteFilter {
        name: "japanese",
        known_suffixes: all_known_suffixes(),
        known_footer_prefixes: vec![BECOME_FOOTER_PREFIX, JAPANESE_FOOTER],
        resolve: Box::new(move |channel_id| {
            modes.get(channel_id).map(|()| RewriteTarget {
                lang: "ja".into(),
                suffix: JAPANESE_SUFFIX.into(),
                footer: JAPANESE_FOOTER.into(),
            })
        }),
    }
}

impl RewriteFilter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluate one message event.
    pub fn decide(&self, msg: &MessageSnapshot) -> RewriteDecision {
        if !msg.from_self {
            return RewriteDecision::Ignored;
        }
        let Some(target) = (self.resolve)(msg.channel_id) else {
            return RewriteDecision::Ignored;
        };
        if self.already_rewritten(msg) {
            return RewriteDecision::AlreadyRewritten;
        }
        RewriteDecision::Rewrite(target)
    }

    fn already_rewritten(&self, msg: &MessageSnapshot) -> bool {
        if !msg.content.is_empty()
            && self.known_suffixes.iter().any(|s| msg.content.ends_with(s))
        {
            return true;
        }
        msg.embeds.iter().any(|embed| {
            embed.footer.as_deref().is_some_and(|footer| {
                self.known_footer_prefixes.iter().any(|p| footer.starts_with(p))
            })
        })
    }

    /// Transform every part of the message independently and stamp the
    /// marker. The first transport failure aborts the whole rewrite — the
    /// caller leaves the message untouched, so no marker is ever stamped
    /// onto untranslated content.
    pub async fn rewrite(
        &self,
        translator: &dyn Translate,
        msg: &MessageSnapshot,
        target: &RewriteTarget,
    ) -> Result<RewrittenMessage, BackendError> {
        let content = if msg.content.is_empty() {
            None
        } else {
            let translated = translator.translate(&msg.content, &target.lang).await?;
            Some(format!("{translated}{}", target.suffix))
        };

        let mut embeds = Vec::with_capacity(msg.embeds.len());
        for embed in &msg.embeds {
            let title = match &embed.title {
                Some(t) => Some(translator.translate(t, &target.lang).await?),
                None => None,
            };
            let description = match &embed.description {
                Some(d) => Some(translator.translate(d, &target.lang).await?),
                None => None,
            };
            let mut fields = Vec::with_capacity(embed.fields.len());
            for field in &embed.fields {
                fields.push(EmbedField {
                    name: translator.translate(&field.name, &target.lang).await?,
                    value: translator.translate(&field.value, &target.lang).await?,
                    inline: field.inline,
                });
            }
            embeds.push(EmbedParts {
                title,
                description,
                fields,
                footer: Some(target.footer.clone()),
                color: embed.color,
            });
        }

        Ok(RewrittenMessage { content, embeds })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EmbedField, EmbedParts, JAPANESE_FOOTER, MessageSnapshot, RewriteDecision,
        become_filter, japanese_filter,
    };
    use crate::backends::translate::{Translate, TranslateClient};
    use crate::error::BackendError;
    use crate::modes::{ChannelModes, find_language};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Deterministic mock: wraps input in angle brackets.
    struct Bracketing;

    #[async_trait]
    impl Translate for Bracketing {
        async fn translate(&self, text: &str, _target: &str) -> Result<String, BackendError> {
            Ok(format!("<{text}>"))
        }
    }

    /// Mock that is always unreachable.
    struct Unreachable;

    #[async_trait]
    impl Translate for Unreachable {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
    }

    fn snapshot(content: &str) -> MessageSnapshot {
        MessageSnapshot {
            from_self: true,
            channel_id: 42,
            content: content.into(),
            embeds: Vec::new(),
        }
    }

    fn become_in_channel_42() -> super::RewriteFilter {
        let modes = Arc::new(ChannelModes::new());
        modes.set(42, find_language("french").unwrap());
        become_filter(modes)
    }

    #[test]
    fn foreign_authors_are_ignored() {
        let filter = become_in_channel_42();
        let mut msg = snapshot("hello");
        msg.from_self = false;
        assert_eq!(filter.decide(&msg), RewriteDecision::Ignored);
    }

    #[test]
    fn unregistered_channels_are_ignored() {
        let filter = become_in_channel_42();
        let mut msg = snapshot("hello");
        msg.channel_id = 999;
        assert_eq!(filter.decide(&msg), RewriteDecision::Ignored);
    }

    #[tokio::test]
    async fn rewrite_translates_and_stamps_marker() {
        let filter = become_in_channel_42();
        let msg = snapshot("hello");

        let RewriteDecision::Rewrite(target) = filter.decide(&msg) else {
            panic!("expected rewrite");
        };
        assert_eq!(target.lang, "fr");

        let rewritten = filter.rewrite(&Bracketing, &msg, &target).await.unwrap();
        assert_eq!(rewritten.content.as_deref(), Some("<hello> 🇫🇷"));
    }

    #[tokio::test]
    async fn rewrite_is_idempotent() {
        let filter = become_in_channel_42();
        let msg = snapshot("hello");
        let RewriteDecision::Rewrite(target) = filter.decide(&msg) else {
            panic!("expected rewrite");
        };
        let rewritten = filter.rewrite(&Bracketing, &msg, &target).await.unwrap();

        // Feeding the rewritten message back through is a no-op.
        let second = MessageSnapshot {
            content: rewritten.content.clone().unwrap(),
            ..snapshot("")
        };
        assert_eq!(filter.decide(&second), RewriteDecision::AlreadyRewritten);
    }

    #[tokio::test]
    async fn embeds_are_translated_part_by_part() {
        let filter = become_in_channel_42();
        let mut msg = snapshot("");
        msg.embeds.push(EmbedParts {
            title: Some("Title".into()),
            description: Some("Body".into()),
            fields: vec![EmbedField { name: "K".into(), value: "V".into(), inline: true }],
            footer: None,
            color: Some(0x3498db),
        });

        let RewriteDecision::Rewrite(target) = filter.decide(&msg) else {
            panic!("expected rewrite");
        };
        let rewritten = filter.rewrite(&Bracketing, &msg, &target).await.unwrap();

        assert!(rewritten.content.is_none());
        let embed = &rewritten.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("<Title>"));
        assert_eq!(embed.description.as_deref(), Some("<Body>"));
        assert_eq!(embed.fields[0].name, "<K>");
        assert_eq!(embed.fields[0].value, "<V>");
        assert!(embed.fields[0].inline);
        assert_eq!(embed.footer.as_deref(), Some("i'm french 🇫🇷"));
        assert_eq!(embed.color, Some(0x3498db));
    }

    #[test]
    fn embed_footer_marker_is_detected() {
        let filter = become_in_channel_42();
        let mut msg = snapshot("");
        msg.embeds.push(EmbedParts {
            footer: Some("i'm french 🇫🇷".into()),
            ..EmbedParts::default()
        });
        assert_eq!(filter.decide(&msg), RewriteDecision::AlreadyRewritten);
    }

    #[tokio::test]
    async fn filters_do_not_reprocess_each_others_output() {
        let r#become = become_in_channel_42();
        let japanese_modes = Arc::new(ChannelModes::new());
        japanese_modes.set(42, ());
        let japanese = japanese_filter(japanese_modes);

        // Become rewrites first; japanese must then leave it alone.
        let msg = snapshot("hello");
        let RewriteDecision::Rewrite(target) = r#become.decide(&msg) else {
            panic!("expected rewrite");
        };
        let rewritten = r#become.rewrite(&Bracketing, &msg, &target).await.unwrap();
        let after = MessageSnapshot {
            content: rewritten.content.unwrap(),
            ..snapshot("")
        };
        assert_eq!(japanese.decide(&after), RewriteDecision::AlreadyRewritten);

        // And the other way round.
        let RewriteDecision::Rewrite(target) = japanese.decide(&snapshot("hello")) else {
            panic!("expected rewrite");
        };
        let rewritten = japanese.rewrite(&Bracketing, &snapshot("hello"), &target).await.unwrap();
        let after = MessageSnapshot {
            content: rewritten.content.unwrap(),
            ..snapshot("")
        };
        assert_eq!(r#become.decide(&after), RewriteDecision::AlreadyRewritten);

        // Japanese embeds carry their fixed footer.
        let mut with_embed = snapshot("");
        with_embed.embeds.push(EmbedParts { footer: Some(JAPANESE_FOOTER.into()), ..EmbedParts::default() });
        assert_eq!(r#become.decide(&with_embed), RewriteDecision::AlreadyRewritten);
    }

    #[tokio::test]
    async fn transport_failure_aborts_without_marker() {
        let filter = become_in_channel_42();
        let msg = snapshot("hello");
        let RewriteDecision::Rewrite(target) = filter.decide(&msg) else {
            panic!("expected rewrite");
        };
        let result = filter.rewrite(&Unreachable, &msg, &target).await;
        assert!(result.is_err());
        // The caller swallows the error and leaves the message as-is, so the
        // original content survives with no marker.
        assert_eq!(filter.decide(&msg), RewriteDecision::Rewrite(target));
    }

    #[tokio::test]
    async fn unreachable_backend_leaves_message_untouched() {
        // Nothing listens on this port; the client fails at connect time.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(250))
            .build()
            .unwrap();
        let client = TranslateClient::new(http, "http://127.0.0.1:9".into());

        let filter = become_in_channel_42();
        let msg = snapshot("hello");
        let RewriteDecision::Rewrite(target) = filter.decide(&msg) else {
            panic!("expected rewrite");
        };
        let result = filter.rewrite(&client, &msg, &target).await;
        assert!(result.is_err(), "transport failure must abort the rewrite");
    }
}
