use crate::config::HELP_TEXT;
use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{
    ActivityData, Colour, Context, CreateEmbed, CreateMessage, FullEvent, OnlineStatus,
};

#[derive(Debug, Clone)]
pub struct ReadyHandler;

#[async_trait]
impl EventHandler for ReadyHandler {
    fn name(&self) -> &str {
        "Ready"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let FullEvent::Ready { .. } = event {
            ctx.set_presence(
                Some(ActivityData::playing("Team Fortress 2")),
                OnlineStatus::Online,
            )
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

/// Mentioning the bot replies with the command reference.
#[derive(Debug, Clone)]
pub struct MentionHelpHandler;

#[async_trait]
impl EventHandler for MentionHelpHandler {
    fn name(&self) -> &str {
        "MentionHelp"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let FullEvent::Message { new_message } = event {
            if new_message.author.bot {
                return Ok(());
            }
            let bot_id = ctx.cache.current_user().id;
            if !new_message.mentions_user_id(bot_id) {
                return Ok(());
            }
            let embed = CreateEmbed::new()
                .title("📋 Bot Help")
                .description(HELP_TEXT)
                .colour(Colour::BLUE);
            new_message
                .channel_id
                .send_message(ctx, CreateMessage::new().embed(embed))
                .await?;
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
