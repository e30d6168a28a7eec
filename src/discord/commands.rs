//! Slash command definitions and handlers.

use crate::BotState;
use crate::backends::auto1111::ImageRequest;
use crate::backends::shodan::{self, HostMatch};
use crate::discord::{relay, render};
use crate::error::{BackendError, PoolError, Result};
use crate::modes::{LANGUAGES, find_language};
use crate::paginate::{DisplayMode, PagedView};
use crate::rewrite::JAPANESE_FOOTER;
use serenity::all::{
    ChannelId, CommandInteraction, CommandOptionType, Context, CreateAttachment,
    CreateAutocompleteResponse, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, EditInteractionResponse, GetMessages, ResolvedValue,
};
use std::sync::Arc;

/// Discord embed description ceiling.
const EMBED_DESCRIPTION_CEILING: usize = 4096;

const DEFAULT_CHAT_PROMPT: &str = "Give me a short description of yourself.";
const DEFAULT_IMAGE_PROMPT: &str =
    "a photo of the most handsome cat, with glasses, his name is jack, stylish";

/// How many history messages feed the generative backend as context.
const HISTORY_LIMIT: u8 = 50;

/// All global slash commands.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("gemini")
            .description("Talk to the Google Gemini AI")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prompt", "What to ask")
                    .required(false),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Attachment,
                    "attachment",
                    "Image, video, audio, or PDF to include",
                )
                .required(false),
            ),
        CreateCommand::new("wizard")
            .description("Talk to the Wizard roleplay AI")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prompt", "What to ask")
                    .required(false),
            ),
        CreateCommand::new("sd")
            .description("Generate an image using Stable Diffusion")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prompt", "Image prompt")
                    .required(false),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "negative_prompt",
                    "What to avoid",
                )
                .required(false),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Number, "cfg", "CFG scale")
                    .required(false),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "steps", "Sampling steps")
                    .required(false),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "sampler", "Sampler name")
                    .required(false),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "restore_faces",
                    "Run face restoration",
                )
                .required(false),
            ),
        CreateCommand::new("shodan")
            .description("Search Shodan for city screenshots")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "city", "City name")
                    .required(true),
            ),
        CreateCommand::new("mcserver")
            .description("Search Shodan for public Minecraft servers in a city")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "city", "City name")
                    .required(true),
            ),
        CreateCommand::new("shodanquery")
            .description("Search Shodan with a custom query")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "query",
                    "Query (supports show:screenshot / show:list)",
                )
                .required(true),
            ),
        CreateCommand::new("become")
            .description("Translate all bot responses in this channel into a language")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "language", "Language, or 'off'")
                    .required(true)
                    .set_autocomplete(true),
            ),
        CreateCommand::new("becomelist").description("List all available languages to become"),
        CreateCommand::new("becomejapanese")
            .description("Toggle japanese mode for this channel"),
        CreateCommand::new("japanesemode")
            .description("Translate one message into japanese")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "text", "Text to translate")
                    .required(true),
            ),
        CreateCommand::new("redorblack")
            .description("Ask a quantum number generator whether to pick red or black"),
    ]
}

/// Route one slash command to its handler.
pub async fn dispatch(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) {
    let result = match cmd.data.name.as_str() {
        "gemini" => gemini(state, ctx, cmd).await,
        "wizard" => wizard(state, ctx, cmd).await,
        "sd" => stable_diffusion(state, ctx, cmd).await,
        "shodan" => shodan_city(state, ctx, cmd).await,
        "mcserver" => mcserver(state, ctx, cmd).await,
        "shodanquery" => shodan_query(state, ctx, cmd).await,
        "become" => r#become(state, ctx, cmd).await,
        "becomelist" => become_list(ctx, cmd).await,
        "becomejapanese" => become_japanese(state, ctx, cmd).await,
        "japanesemode" => japanese_mode(state, ctx, cmd).await,
        "redorblack" => red_or_black(state, ctx, cmd).await,
        other => {
            tracing::warn!(command = %other, "unknown slash command");
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::warn!(command = %cmd.data.name, error = %e, "command failed");
    }
}

/// Autocomplete for the become language option.
pub async fn autocomplete(ctx: &Context, interaction: &CommandInteraction) {
    if interaction.data.name != "become" {
        return;
    }
    let Some(option) = interaction.data.autocomplete() else {
        return;
    };
    let current = option.value.to_lowercase();

    let mut response = CreateAutocompleteResponse::new().add_string_choice("Off (default)", "off");
    for lang in LANGUAGES.iter().filter(|l| l.name.contains(&current)).take(24) {
        response = response.add_string_choice(
            format!("{} {}", title_case(lang.name), lang.marker.trim()),
            lang.name,
        );
    }

    if let Err(e) = interaction
        .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
        .await
    {
        tracing::debug!(error = %e, "autocomplete response failed");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn gemini(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    respond_embed(ctx, cmd, render::wait_embed("Gemini")).await?;

    if !state.backends.gemini.has_keys() {
        return edit_embed(
            ctx,
            cmd,
            render::notice_embed("Gemini", "No Gemini API keys are configured on this bot."),
        )
        .await;
    }

    let prompt = str_option(cmd, "prompt").unwrap_or(DEFAULT_CHAT_PROMPT).to_string();
    let history = channel_history(ctx, cmd.channel_id).await.unwrap_or_default();
    let attachments = relay::from_command(state.backends.http(), cmd).await;

    let system = format!(
        "You are a helpful assistant.\n\nRecent channel history for context:\n\n{history}"
    );

    let description = match state
        .backends
        .gemini
        .generate(&state.config.gemini.chat_model, &system, &prompt, attachments)
        .await
    {
        Ok(text) => render::clamp(&text, EMBED_DESCRIPTION_CEILING),
        Err(e) => format!("🤖⚡💥 {e}"),
    };

    edit_embed(ctx, cmd, render::notice_embed("Gemini", description)).await
}

async fn wizard(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    respond_embed(ctx, cmd, render::wait_embed("Wizard")).await?;

    let prompt = str_option(cmd, "prompt").unwrap_or(DEFAULT_CHAT_PROMPT).to_string();
    let description = match state.backends.chat.complete(&prompt).await {
        Ok(text) => render::clamp(&text, EMBED_DESCRIPTION_CEILING),
        Err(PoolError::Exhausted { last }) => {
            tracing::info!(last = %last, "chat pool exhausted");
            "All LM Studio hosts are currently offline.".into()
        }
        Err(e) => e.to_string(),
    };

    edit_embed(ctx, cmd, render::notice_embed("Wizard", description)).await
}

async fn stable_diffusion(
    state: &Arc<BotState>,
    ctx: &Context,
    cmd: &CommandInteraction,
) -> Result<()> {
    let mut request = ImageRequest::new(
        str_option(cmd, "prompt").unwrap_or(DEFAULT_IMAGE_PROMPT),
    );
    if let Some(negative) = str_option(cmd, "negative_prompt") {
        request.negative_prompt = negative.to_string();
    }
    if let Some(cfg) = number_option(cmd, "cfg") {
        request.cfg_scale = cfg as f32;
    }
    if let Some(steps) = integer_option(cmd, "steps") {
        request.steps = steps.clamp(1, 150) as u32;
    }
    if let Some(sampler) = str_option(cmd, "sampler") {
        request.sampler_index = sampler.to_string();
    }
    if let Some(restore) = bool_option(cmd, "restore_faces") {
        request.restore_faces = restore;
    }

    let params = format!(
        "Prompt: {}\nNegative Prompt: {}\nCFG Scale: {}\nSteps: {}\nSampler: {}\nRestore Faces: {}",
        request.prompt,
        render::clamp(&request.negative_prompt, 512),
        request.cfg_scale,
        request.steps,
        request.sampler_index,
        request.restore_faces,
    );
    respond_embed(
        ctx,
        cmd,
        render::notice_embed("Stable Diffusion", format!("{params}\nPlease wait...")),
    )
    .await?;

    match state.backends.image.generate(&request).await {
        Ok(bytes) => {
            let filename = format!("{}.png", cmd.id.get());
            cmd.create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .add_file(CreateAttachment::bytes(bytes, filename)),
            )
            .await?;
            cmd.delete_response(&ctx.http).await?;
            Ok(())
        }
        Err(e) => {
            tracing::info!(error = %e, "image pool failed");
            edit_embed(
                ctx,
                cmd,
                render::notice_embed(
                    "Stable Diffusion",
                    format!("{params}\nAll Stable Diffusion hosts are currently offline."),
                ),
            )
            .await
        }
    }
}

async fn shodan_city(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let Some(client) = &state.backends.shodan else {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed("Shodan", "`SHODAN_KEY` is not set on this bot."),
        )
        .await;
    };

    let city = str_option(cmd, "city").unwrap_or("").trim().to_string();
    if city.is_empty() {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed("Shodan", "Please provide a city name. Example: `/shodan Adelaide`"),
        )
        .await;
    }

    let query = shodan::city_screenshot_query(&city);
    respond_embed(
        ctx,
        cmd,
        render::notice_embed("Shodan", format!("Searching: `{query}`\nPlease wait...")),
    )
    .await?;

    let matches = match client.search(&query).await {
        Ok(matches) => matches,
        Err(e) => return edit_embed(ctx, cmd, shodan_error_embed("Shodan", &e)).await,
    };
    if matches.is_empty() {
        return edit_embed(ctx, cmd, render::notice_embed("Shodan", "No results.")).await;
    }

    let with_shots: Vec<HostMatch> =
        matches.into_iter().filter(|m| m.has_screenshot()).collect();
    if with_shots.is_empty() {
        return edit_embed(
            ctx,
            cmd,
            render::notice_embed("Shodan", "Results found, but none included screenshot data."),
        )
        .await;
    }

    let view = PagedView::new(cmd.user.id.get(), with_shots, 1, DisplayMode::Screenshot, query);
    present_view(state, ctx, cmd, view).await
}

async fn mcserver(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let Some(client) = &state.backends.shodan else {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed("Minecraft Server Finder", "`SHODAN_KEY` is not set on this bot."),
        )
        .await;
    };

    let city = str_option(cmd, "city").unwrap_or("").trim().to_string();
    if city.is_empty() {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed(
                "Minecraft Server Finder",
                "Please provide a city name. Example: `/mcserver Paris`",
            ),
        )
        .await;
    }

    let query = shodan::city_port_query(&city, 25565);
    respond_embed(
        ctx,
        cmd,
        render::notice_embed(
            "Minecraft Server Finder",
            format!("Searching: `{query}`\nPlease wait..."),
        ),
    )
    .await?;

    let matches = match client.search(&query).await {
        Ok(matches) => matches,
        Err(e) => {
            return edit_embed(ctx, cmd, shodan_error_embed("Minecraft Server Finder", &e)).await;
        }
    };
    if matches.is_empty() {
        return edit_embed(
            ctx,
            cmd,
            render::notice_embed("Minecraft Server Finder", "No Minecraft servers found."),
        )
        .await;
    }

    let view = PagedView::new(cmd.user.id.get(), matches, 10, DisplayMode::List, query);
    present_view(state, ctx, cmd, view).await
}

async fn shodan_query(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let Some(client) = &state.backends.shodan else {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed("Shodan", "`SHODAN_KEY` is not set on this bot."),
        )
        .await;
    };

    let raw = str_option(cmd, "query").unwrap_or("").to_string();
    let (query, screenshots) = shodan::parse_query_directives(&raw);
    if query.is_empty() {
        return respond_embed(
            ctx,
            cmd,
            render::notice_embed("Shodan", "Please provide a query."),
        )
        .await;
    }

    respond_embed(
        ctx,
        cmd,
        render::notice_embed("Shodan", format!("Searching: `{query}`\nPlease wait...")),
    )
    .await?;

    let matches = match client.search(&query).await {
        Ok(matches) => matches,
        Err(e) => return edit_embed(ctx, cmd, shodan_error_embed("Shodan", &e)).await,
    };
    if matches.is_empty() {
        return edit_embed(ctx, cmd, render::notice_embed("Shodan", "No results.")).await;
    }

    let view = if screenshots {
        let with_shots: Vec<HostMatch> =
            matches.into_iter().filter(|m| m.has_screenshot()).collect();
        if with_shots.is_empty() {
            return edit_embed(
                ctx,
                cmd,
                render::notice_embed("Shodan", "Results found, but none included screenshot data."),
            )
            .await;
        }
        PagedView::new(cmd.user.id.get(), with_shots, 1, DisplayMode::Screenshot, raw)
    } else {
        PagedView::new(cmd.user.id.get(), matches, 10, DisplayMode::List, raw)
    };
    present_view(state, ctx, cmd, view).await
}

async fn r#become(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let input = str_option(cmd, "language").unwrap_or("").trim().to_lowercase();
    let channel_id = cmd.channel_id.get();

    let embed = if input == "off" {
        state.become_modes.clear(channel_id);
        render::notice_embed("become OFF", "back to normal")
    } else if let Some(lang) = find_language(&input) {
        state.become_modes.set(channel_id, lang);
        render::notice_embed(
            format!("become → {}{}", lang.name, lang.marker),
            format!("all bot responses in this channel will now be {}", lang.name),
        )
    } else {
        render::notice_embed("become failed", format!("'{input}' isn't a language"))
    };
    respond_embed(ctx, cmd, embed).await
}

async fn become_list(ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let lines: Vec<String> = LANGUAGES
        .iter()
        .map(|l| format!("{} {}", l.marker.trim(), title_case(l.name)))
        .collect();
    respond_embed(
        ctx,
        cmd,
        render::notice_embed("become languages", lines.join("\n")),
    )
    .await
}

async fn become_japanese(
    state: &Arc<BotState>,
    ctx: &Context,
    cmd: &CommandInteraction,
) -> Result<()> {
    let channel_id = cmd.channel_id.get();
    if state.japanese_modes.clear(channel_id) {
        respond_embed(
            ctx,
            cmd,
            render::notice_embed("japanese mode OFF", "no longer japanese :("),
        )
        .await
    } else {
        state.japanese_modes.set(channel_id, ());
        // The footer doubles as the rewrite marker, so the filter leaves
        // this confirmation untouched.
        let embed = render::notice_embed(
            "japanese mode ON",
            "all bot responses in this channel will now become japanese",
        )
        .footer(CreateEmbedFooter::new(JAPANESE_FOOTER));
        respond_embed(ctx, cmd, embed).await
    }
}

async fn japanese_mode(
    state: &Arc<BotState>,
    ctx: &Context,
    cmd: &CommandInteraction,
) -> Result<()> {
    let text = str_option(cmd, "text").unwrap_or("").to_string();
    respond_embed(
        ctx,
        cmd,
        render::notice_embed("japanese mode ON", "becoming japanese..."),
    )
    .await?;

    let embed = match state.backends.translate.translate_strict(&text, "ja").await {
        Ok(translated) => render::notice_embed(
            "日本人になる",
            render::clamp(&translated, EMBED_DESCRIPTION_CEILING),
        )
        .footer(CreateEmbedFooter::new(JAPANESE_FOOTER)),
        Err(BackendError::Status { status, .. }) => render::notice_embed(
            "japanesemode failed",
            format!("could not become japanese :( ({status})"),
        ),
        Err(e) => {
            tracing::info!(error = %e, "translation backend unreachable");
            render::notice_embed(
                "japanesemode failed",
                "the translation backend is unreachable :(",
            )
        }
    };
    edit_embed(ctx, cmd, embed).await
}

async fn red_or_black(state: &Arc<BotState>, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    respond_embed(ctx, cmd, render::wait_embed("Red or Black?")).await?;

    let embed = match state.backends.qrng.pick().await {
        Ok(pick) => render::notice_embed("Red or Black?", format!("Pick **{}**!", pick.label())),
        Err(BackendError::Status { status, .. }) => render::notice_embed(
            "Red or Black?",
            format!("Error fetching quantum number ({status})"),
        ),
        Err(BackendError::Malformed(_)) => {
            render::notice_embed("Red or Black?", "QRNG did not return a valid number.")
        }
        Err(e) => render::notice_embed("Red or Black?", e.to_string()),
    };
    edit_embed(ctx, cmd, embed).await
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Render the view's first page into the deferred response and register the
/// view under the response message's ID.
async fn present_view(
    state: &Arc<BotState>,
    ctx: &Context,
    cmd: &CommandInteraction,
    view: PagedView,
) -> Result<()> {
    let page = view.render();
    let mut builder = EditInteractionResponse::new()
        .embed(render::page_embed(&page))
        .components(render::page_components(&page));
    for file in render::page_attachments(&page) {
        builder = builder.new_attachment(file);
    }
    let message = cmd.edit_response(&ctx.http, builder).await?;
    state.views.insert(message.id.get(), view);
    Ok(())
}

async fn respond_embed(ctx: &Context, cmd: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
    )
    .await?;
    Ok(())
}

async fn edit_embed(ctx: &Context, cmd: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    cmd.edit_response(&ctx.http, EditInteractionResponse::new().embed(embed)).await?;
    Ok(())
}

fn shodan_error_embed(title: &str, error: &BackendError) -> CreateEmbed {
    match error {
        BackendError::Status { status, message } => render::notice_embed(
            title,
            format!("Error from Shodan: `{status}`\n{message}"),
        ),
        other => render::notice_embed(title, format!("Request failed: `{other}`")),
    }
}

/// Last `HISTORY_LIMIT` messages of the channel, oldest first, one
/// `author: content` line each.
pub async fn channel_history(ctx: &Context, channel_id: ChannelId) -> Result<String> {
    let messages = channel_id
        .messages(&ctx.http, GetMessages::new().limit(HISTORY_LIMIT))
        .await?;
    Ok(messages
        .iter()
        .rev()
        .map(|m| format!("{}: {}", m.author.name, m.content))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn str_option<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    cmd.data.options().into_iter().find(|o| o.name == name).and_then(|o| match o.value {
        ResolvedValue::String(s) => Some(s),
        _ => None,
    })
}

fn number_option(cmd: &CommandInteraction, name: &str) -> Option<f64> {
    cmd.data.options().into_iter().find(|o| o.name == name).and_then(|o| match o.value {
        ResolvedValue::Number(n) => Some(n),
        _ => None,
    })
}

fn integer_option(cmd: &CommandInteraction, name: &str) -> Option<i64> {
    cmd.data.options().into_iter().find(|o| o.name == name).and_then(|o| match o.value {
        ResolvedValue::Integer(n) => Some(n),
        _ => None,
    })
}

fn bool_option(cmd: &CommandInteraction, name: &str) -> Option<bool> {
    cmd.data.options().into_iter().find(|o| o.name == name).and_then(|o| match o.value {
        ResolvedValue::Boolean(b) => Some(b),
        _ => None,
    })
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::title_case;

    #[test]
    fn title_cases_multiword_names() {
        assert_eq!(title_case("french"), "French");
        assert_eq!(title_case("chinese (traditional)"), "Chinese (traditional)");
    }
}
