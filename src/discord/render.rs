//! Embed, attachment, and component construction.

use crate::paginate::PageRender;
use crate::rewrite::{EmbedField, EmbedParts};
use serenity::all::{
    ButtonStyle, Colour, CreateActionRow, CreateAttachment, CreateButton, CreateEmbed,
    CreateEmbedFooter, Embed,
};

pub const PREV_BUTTON_ID: &str = "page_prev";
pub const NEXT_BUTTON_ID: &str = "page_next";

/// Plain titled embed.
pub fn notice_embed(title: impl Into<String>, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().title(title).description(description)
}

/// Placeholder shown while a backend call is in flight.
pub fn wait_embed(title: impl Into<String>) -> CreateEmbed {
    notice_embed(title, "Please wait...")
}

/// Embed for one rendered page.
pub fn page_embed(page: &PageRender) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(page.title.clone())
        .description(page.description.clone())
        .colour(Colour::BLUE)
        .footer(CreateEmbedFooter::new(page.footer.clone()));
    if let Some(image) = &page.image {
        embed = embed.image(format!("attachment://{}", image.filename));
    }
    embed
}

/// Navigation button row; controls are disabled exactly at the boundaries.
pub fn page_components(page: &PageRender) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(PREV_BUTTON_ID)
            .label("◀ Previous Page")
            .style(ButtonStyle::Primary)
            .disabled(!page.prev_enabled),
        CreateButton::new(NEXT_BUTTON_ID)
            .label("Next Page ▶")
            .style(ButtonStyle::Primary)
            .disabled(!page.next_enabled),
    ])]
}

/// Files for one rendered page: the screenshot (if any) and the raw-data
/// bundle (if any).
pub fn page_attachments(page: &PageRender) -> Vec<CreateAttachment> {
    let mut files = Vec::new();
    if let Some(image) = &page.image {
        files.push(CreateAttachment::bytes(image.bytes.clone(), image.filename.clone()));
    }
    if let Some(raw) = &page.raw {
        files.push(CreateAttachment::bytes(raw.bytes.clone(), raw.filename.clone()));
    }
    files
}

/// Rebuild a serenity embed from rewritten parts.
pub fn embed_from_parts(parts: &EmbedParts) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(title) = &parts.title {
        embed = embed.title(title.clone());
    }
    if let Some(description) = &parts.description {
        embed = embed.description(description.clone());
    }
    for field in &parts.fields {
        embed = embed.field(field.name.clone(), field.value.clone(), field.inline);
    }
    if let Some(footer) = &parts.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer.clone()));
    }
    if let Some(color) = parts.color {
        embed = embed.colour(Colour::new(color));
    }
    embed
}

/// Flatten a received embed into the parts the rewrite filter works on.
pub fn parts_from_embed(embed: &Embed) -> EmbedParts {
    EmbedParts {
        title: embed.title.clone(),
        description: embed.description.clone(),
        fields: embed
            .fields
            .iter()
            .map(|f| EmbedField { name: f.name.clone(), value: f.value.clone(), inline: f.inline })
            .collect(),
        footer: embed.footer.as_ref().map(|f| f.text.clone()),
        color: embed.colour.map(|c| c.0),
    }
}

/// Clamp text to a platform ceiling on a char boundary.
pub fn clamp(text: &str, ceiling: usize) -> String {
    if text.chars().count() <= ceiling {
        return text.to_string();
    }
    text.chars().take(ceiling).collect()
}

#[cfg(test)]
mod tests {
    use super::clamp;

    #[test]
    fn clamp_counts_chars_not_bytes() {
        assert_eq!(clamp("héllo", 10), "héllo");
        assert_eq!(clamp("héllo", 3), "hél");
    }
}
