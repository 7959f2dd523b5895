//! Reaction-menu and DM-prompt primitives shared by the command handlers,
//! plus the embed helpers every reply goes through.

use poise::serenity_prelude::{
    Colour, CreateEmbed, CreateMessage, MessageCollector, ReactionCollector, ReactionType,
};
use poise::CreateReply;

use crate::config::{MSG_TIMEOUT, SELECTION_TIMEOUT};
use crate::error::BotError;
use crate::{Context, Error};

/// Ordered label set for reaction menus. Menus cap at its size.
pub const CHOICE_EMOJIS: [&str; 10] = ["🇦", "🇧", "🇨", "🇩", "🇪", "🇫", "🇬", "🇭", "🇮", "🇯"];

/// The labels assigned to `count` options, truncated to the label set.
pub fn choice_labels(count: usize) -> &'static [&'static str] {
    &CHOICE_EMOJIS[..count.min(CHOICE_EMOJIS.len())]
}

pub async fn send_error(ctx: Context<'_>, description: impl Into<String>) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .description(description.into())
        .colour(Colour::RED);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn send_info(ctx: Context<'_>, description: impl Into<String>) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .description(description.into())
        .colour(Colour::BLUE);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn send_success(
    ctx: Context<'_>,
    title: impl Into<String>,
    description: impl Into<String>,
) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .title(title.into())
        .description(description.into())
        .colour(Colour::DARK_GREEN);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show up to ten labeled options and wait for the invoking user to pick
/// one by reaction on that message. Foreign users, other messages and
/// unrelated emojis never resolve the wait. Returns the selected index, or
/// `None` after the timeout notice.
pub async fn present_choice(
    ctx: Context<'_>,
    title: &str,
    options: &[String],
) -> Result<Option<usize>, Error> {
    let labels = choice_labels(options.len());
    let options = &options[..labels.len()];

    let description = labels
        .iter()
        .zip(options)
        .map(|(emoji, option)| format!("{emoji} {option}"))
        .collect::<Vec<_>>()
        .join("\n");
    let embed = CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(Colour::BLUE);
    let handle = ctx.send(CreateReply::default().embed(embed)).await?;
    let message = handle.message().await?;

    for emoji in labels {
        if let Err(e) = message
            .react(
                ctx.serenity_context(),
                ReactionType::Unicode((*emoji).to_string()),
            )
            .await
        {
            tracing::warn!("failed to seed menu reaction: {e}");
            send_error(ctx, "I am missing the permission to add reactions here.").await?;
            return Ok(None);
        }
    }

    let assigned: Vec<String> = labels.iter().map(|e| e.to_string()).collect();
    let reaction = ReactionCollector::new(ctx.serenity_context())
        .message_id(message.id)
        .author_id(ctx.author().id)
        .filter(move |reaction| assigned.iter().any(|e| reaction.emoji.unicode_eq(e)))
        .timeout(SELECTION_TIMEOUT)
        .await;

    match reaction {
        Some(reaction) => {
            let index = labels
                .iter()
                .position(|e| reaction.emoji.unicode_eq(e));
            tracing::info!(
                user = %ctx.author().name,
                ?index,
                "menu selection received"
            );
            Ok(index)
        }
        None => {
            send_error(ctx, MSG_TIMEOUT).await?;
            Ok(None)
        }
    }
}

/// Ask the invoking user for a secret over DM and wait for their reply.
pub async fn prompt_secret(ctx: Context<'_>, prompt: &str) -> Result<String, BotError> {
    let dm = ctx
        .author()
        .create_dm_channel(ctx.serenity_context())
        .await
        .map_err(|_| BotError::PrivateChannelBlocked)?;
    dm.id
        .send_message(
            ctx.serenity_context(),
            CreateMessage::new().content(prompt),
        )
        .await
        .map_err(|_| BotError::PrivateChannelBlocked)?;

    let reply = MessageCollector::new(ctx.serenity_context())
        .channel_id(dm.id)
        .author_id(ctx.author().id)
        .timeout(SELECTION_TIMEOUT)
        .await;

    match reply {
        Some(message) => {
            let secret = message.content.trim().to_string();
            if secret.is_empty() {
                return Err(BotError::Parse("The RCON password cannot be empty.".into()));
            }
            Ok(secret)
        }
        None => Err(BotError::SelectionTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct_and_ordered() {
        let labels = choice_labels(10);
        assert_eq!(labels.len(), 10);
        let mut unique = labels.to_vec();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn label_assignment_truncates_to_the_set_size() {
        assert_eq!(choice_labels(3).len(), 3);
        assert_eq!(choice_labels(25).len(), 10);
        assert!(choice_labels(0).is_empty());
    }
}
