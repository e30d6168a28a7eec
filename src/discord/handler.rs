//! Gateway event handler.

use crate::BotState;
use crate::discord::{commands, relay, render};
use crate::paginate::{Direction, NavOutcome};
use crate::rewrite::{MessageSnapshot, RewriteDecision};
use async_trait::async_trait;
use serenity::all::{
    Command, ComponentInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditMessage, EventHandler, Interaction, Message,
    MessageUpdateEvent, Ready,
};
use std::sync::Arc;

/// Reply ceiling for plain-text messages.
const MESSAGE_CEILING: usize = 2000;

pub struct Handler {
    state: Arc<BotState>,
}

impl Handler {
    pub fn new(state: Arc<BotState>) -> Self {
        Self { state }
    }

    /// Run the rewrite filters over one of the bot's own messages. At most
    /// one filter rewrites per event; the edit re-fires `message_update`,
    /// where marker detection stops the chain.
    async fn apply_rewrite_filters(&self, ctx: &Context, mut msg: Message) {
        let snapshot = MessageSnapshot {
            from_self: true,
            channel_id: msg.channel_id.get(),
            content: msg.content.clone(),
            embeds: msg.embeds.iter().map(render::parts_from_embed).collect(),
        };

        for filter in &self.state.filters {
            let RewriteDecision::Rewrite(target) = filter.decide(&snapshot) else {
                continue;
            };

            match filter.rewrite(&self.state.backends.translate, &snapshot, &target).await {
                Ok(rewritten) => {
                    let mut edit = EditMessage::new();
                    if let Some(content) = rewritten.content {
                        edit = edit.content(content);
                    }
                    edit = edit.embeds(
                        rewritten.embeds.iter().map(render::embed_from_parts).collect(),
                    );
                    if let Err(e) = msg.edit(&ctx.http, edit).await {
                        // Leave the message as it was; chat history integrity
                        // beats a guaranteed rewrite.
                        tracing::debug!(filter = filter.name(), error = %e, "rewrite edit failed");
                    }
                }
                Err(e) => {
                    tracing::debug!(filter = filter.name(), error = %e, "rewrite transform failed");
                }
            }
            return;
        }
    }

    /// Ambient persona reply when a trigger keyword appears in chat.
    async fn maybe_keyword_reply(&self, ctx: &Context, msg: &Message) {
        let lower = msg.content.to_lowercase();
        if !self.state.config.trigger.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return;
        }
        if !self.state.backends.gemini.has_keys() {
            return;
        }

        let history = commands::channel_history(ctx, msg.channel_id).await.unwrap_or_default();
        let system = self.state.config.trigger.persona.replace("{history}", &history);
        let prompt = format!("you are replying to: {}: {}", msg.author.name, msg.content);
        let attachments = relay::from_message(self.state.backends.http(), msg).await;

        match self
            .state
            .backends
            .gemini
            .generate(&self.state.config.gemini.trigger_model, &system, &prompt, attachments)
            .await
        {
            Ok(text) => {
                if let Err(e) = msg.reply(&ctx.http, render::clamp(&text, MESSAGE_CEILING)).await {
                    tracing::warn!(error = %e, "keyword reply failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "keyword generation failed"),
        }
    }

    /// Pagination button presses.
    async fn handle_component(&self, ctx: &Context, component: ComponentInteraction) {
        let direction = match component.data.custom_id.as_str() {
            render::PREV_BUTTON_ID => Direction::Previous,
            render::NEXT_BUTTON_ID => Direction::Next,
            _ => return,
        };

        let outcome = self.state.views.navigate(
            component.message.id.get(),
            component.user.id.get(),
            direction,
        );

        let result = match outcome {
            // View lost to a restart or already reaped; just ack so the
            // click doesn't error client-side.
            None => {
                component
                    .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
                    .await
            }
            Some(NavOutcome::Unauthorized) => {
                component
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::Message(
                            CreateInteractionResponseMessage::new()
                                .content("Only the original requester can use this button.")
                                .ephemeral(true),
                        ),
                    )
                    .await
            }
            Some(NavOutcome::Updated(page)) | Some(NavOutcome::Expired(page)) => {
                let mut message = CreateInteractionResponseMessage::new()
                    .embed(render::page_embed(&page))
                    .components(render::page_components(&page));
                for file in render::page_attachments(&page) {
                    message = message.add_file(file);
                }
                component
                    .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(message))
                    .await
            }
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "component response failed");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "connected to discord");

        for command in commands::definitions() {
            match Command::create_global_command(&ctx.http, command).await {
                Ok(cmd) => tracing::debug!(command = %cmd.name, "registered command"),
                Err(e) => tracing::error!(error = %e, "failed to register command"),
            }
        }
        tracing::info!("slash commands registered");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let own_id = ctx.cache.current_user().id;
        if msg.author.id == own_id {
            self.apply_rewrite_filters(&ctx, msg).await;
            return;
        }
        if msg.author.bot {
            return;
        }
        self.maybe_keyword_reply(&ctx, &msg).await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        // Partial events don't always carry the full message; fetch it then.
        let msg = match new {
            Some(msg) => msg,
            None => match event.channel_id.message(&ctx.http, event.id).await {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(error = %e, "could not fetch edited message");
                    return;
                }
            },
        };

        let own_id = ctx.cache.current_user().id;
        if msg.author.id == own_id {
            self.apply_rewrite_filters(&ctx, msg).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(cmd) => commands::dispatch(&self.state, &ctx, &cmd).await,
            Interaction::Component(component) => self.handle_component(&ctx, component).await,
            Interaction::Autocomplete(auto) => commands::autocomplete(&ctx, &auto).await,
            _ => {}
        }
    }
}
