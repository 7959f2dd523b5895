//! Informational commands plus the end-of-reservation flow.

use chrono::Utc;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter, ReactionType};
use poise::CreateReply;
use tracing::info;

use crate::config::{HELP_TEXT, MSG_NO_RESERVATION, TIMEZONE};
use crate::error::BotError;
use crate::interact::{send_error, send_success};
use crate::modules::reservation::store::LookupTarget;
use crate::modules::server::gate;
use crate::{Context, Error};

/// Show the connection info of a reservation.
#[poise::command(prefix_command)]
pub async fn connect(ctx: Context<'_>, target: Option<String>) -> Result<(), Error> {
    let data = ctx.data();
    let target = target
        .as_deref()
        .and_then(LookupTarget::parse)
        .unwrap_or_default();

    // An id target is looked up in the requester's own reservations, a
    // member target in theirs.
    let (user_id, display, wanted_id) = match &target {
        LookupTarget::Member { id, display } => (*id, display.clone(), None),
        LookupTarget::Reservation(id) => (ctx.author().id.get(), "you".to_string(), Some(*id)),
        LookupTarget::Requester => (ctx.author().id.get(), "you".to_string(), None),
    };

    let records = data.store.confirmed_for(user_id);
    if records.is_empty() {
        return send_error(ctx, format!("No active reservation for {display}.")).await;
    }
    let record = match wanted_id {
        Some(id) => match records.iter().find(|r| r.reservation_id == Some(id)) {
            Some(record) => record.clone(),
            None => {
                return send_error(ctx, format!("No reservation with ID {id}. Check with `!list`."))
                    .await
            }
        },
        None => records[records.len() - 1].clone(),
    };

    let embed = CreateEmbed::new()
        .title("🔗 Connection")
        .description(format!(
            "**Server:** {}\n**Connect info:**\n```\nconnect {}; password \"{}\"\n```",
            record.server_name, record.ip_and_port, record.password
        ))
        .colour(Colour::BLUE)
        .footer(CreateEmbedFooter::new(format!(
            "ID {} | Creator: {} | Start: {} (Paris)",
            record.reservation_id.unwrap_or_default(),
            record.creator_name,
            record.start.format("%Y-%m-%d %H:%M")
        )));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List every reservation still inside its grace window.
#[poise::command(prefix_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let now = Utc::now().with_timezone(&TIMEZONE);
    let records = data.store.snapshot();

    let mut lines = String::new();
    for record in &records {
        match record.reservation_id {
            Some(id) => {
                if now > record.visible_until() {
                    continue;
                }
                lines.push_str(&format!(
                    "**ID `{}`**: {}\n - **Creator**: {}\n - **Start**: {} (Paris)\n - **End**: {} (Paris)\n",
                    id,
                    record.server_name,
                    record.creator_name,
                    record.start.format("%Y-%m-%d %H:%M"),
                    record.end.format("%Y-%m-%d %H:%M")
                ));
            }
            None => {
                lines.push_str(&format!(
                    "Awaiting confirmation for {} (Paris) by {}\n",
                    record.start.format("%Y-%m-%d %H:%M"),
                    record.creator_name
                ));
            }
        }
    }

    if lines.is_empty() {
        let embed = CreateEmbed::new()
            .title("No reservations")
            .description(MSG_NO_RESERVATION)
            .colour(Colour::RED);
        ctx.send(CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    lines.push_str("\nUse `!end <reservation_id>` or `!end` to end your reservations.");
    let embed = CreateEmbed::new()
        .title("📋 Active reservations")
        .description(lines)
        .colour(Colour::BLUE);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// End a reservation. Ending someone else's requires their RCON secret.
#[poise::command(prefix_command)]
pub async fn end(ctx: Context<'_>, target: Option<String>) -> Result<(), Error> {
    let data = ctx.data();
    let target = match target.as_deref() {
        None => LookupTarget::Requester,
        Some(token) => match LookupTarget::parse(token) {
            Some(target) => target,
            None => {
                return send_error(ctx, "Use `!end`, `!end @creator` or `!end <reservation_id>`.")
                    .await
            }
        },
    };

    let now = Utc::now().with_timezone(&TIMEZONE);
    let record = match data
        .store
        .find_reservation(ctx.author().id.get(), &target, now)
    {
        Ok(record) => record,
        Err(e) => return send_error(ctx, BotError::from(e).to_string()).await,
    };
    if let Err(e) = gate::authorize(ctx, &record).await {
        return send_error(ctx, e.to_string()).await;
    }

    let reservation_id = record.reservation_id.unwrap_or_default();
    match data.serveme.end_reservation(reservation_id).await {
        Ok(()) => {
            data.notifier.cancel(reservation_id);
            data.store.remove(record.creator_id, reservation_id);
            info!(reservation_id, user = %ctx.author().name, "reservation ended");
            send_success(
                ctx,
                "✅ Reservation ended",
                format!("Reservation ID `{reservation_id}` is over."),
            )
            .await
        }
        Err(e) => send_error(ctx, format!("Could not end the reservation: {e}")).await,
    }
}

/// Collect weekly availability through reactions.
#[poise::command(prefix_command)]
pub async fn dispo(ctx: Context<'_>) -> Result<(), Error> {
    const DAYS: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];
    const SLOTS: [&str; 4] = ["✅", "☑️", "❌", "🐟"];

    let instructions = CreateEmbed::new()
        .title("Give your availability")
        .description(
            "React on each day below with the matching emoji:\n\n\
             ✅ 20h\n☑️ 21h\n❌ Not available\n🐟 Sub",
        )
        .colour(Colour::BLUE);
    ctx.send(CreateReply::default().embed(instructions)).await?;

    for day in DAYS {
        let embed = CreateEmbed::new()
            .title(format!("Availability for {day}"))
            .description("React with the emoji matching your availability.")
            .colour(Colour::BLUE);
        let handle = ctx.send(CreateReply::default().embed(embed)).await?;
        let message = handle.message().await?;
        for emoji in SLOTS {
            message
                .react(ctx.serenity_context(), ReactionType::Unicode(emoji.to_string()))
                .await?;
        }
    }
    Ok(())
}

/// Show the command reference.
#[poise::command(prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .title("📋 Bot Help")
        .description(HELP_TEXT)
        .colour(Colour::BLUE);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
