//! The `!reserve` flow: parse the window, search, drive the menus, book,
//! then hand off to the notifier.

use chrono::Utc;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateMessage, Mentionable};
use tracing::info;

use crate::config::{
    config_file_for_map, AVAILABLE_MAPS, DEFAULT_RCON, MSG_ALREADY_ACTIVE, MSG_DM_BLOCKED,
    MSG_USAGE, TIMEZONE,
};
use crate::error::BotError;
use crate::interact::{present_choice, prompt_secret, send_error, send_success};
use crate::modules::reservation::serveme::{group_servers, CreateReservation, FoundServers};
use crate::modules::reservation::store::ReservationRecord;
use crate::modules::reservation::time::{parse_reserve_args, ReserveRequest};
use crate::{Context, Error};

/// Reserve a server for two hours.
#[poise::command(prefix_command, guild_only)]
pub async fn reserve(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    let data = ctx.data();
    let author = ctx.author();
    let now = Utc::now().with_timezone(&TIMEZONE);

    if data.store.has_active(author.id.get(), now) {
        return send_error(ctx, MSG_ALREADY_ACTIVE).await;
    }
    let Some(args) = args else {
        return send_error(ctx, MSG_USAGE).await;
    };
    let request = match parse_reserve_args(&args, now) {
        Ok(request) => request,
        Err(e) => return send_error(ctx, e.to_string()).await,
    };

    ctx.say(format!(
        "Searching for servers opening {}...",
        request.start.format("%Y-%m-%d %H:%M")
    ))
    .await?;

    let found = match data.serveme.find_servers(&request.start, &request.end).await {
        Ok(found) => found,
        Err(e) => return send_error(ctx, e.to_string()).await,
    };
    if found.servers.is_empty() {
        return send_error(ctx, BotError::NoServersAvailable.to_string()).await;
    }

    // A pending record bridges search and confirmation; every exit from
    // the booking flow below clears it again.
    data.store.append(ReservationRecord::pending(
        author.id.get(),
        author.name.clone(),
        request.start,
        request.end,
    ));
    let outcome = drive_booking(ctx, &request, &found).await;
    data.store.remove_pending(author.id.get());
    outcome
}

/// Menus, secret, booking call, announcements, deferred notification.
/// Returns `Ok(())` on aborted flows too; the user has been notified by
/// the step that aborted.
async fn drive_booking(
    ctx: Context<'_>,
    request: &ReserveRequest,
    found: &FoundServers,
) -> Result<(), Error> {
    let data = ctx.data();
    let author = ctx.author();

    let groups = group_servers(&found.servers);
    if groups.is_empty() {
        return send_error(ctx, BotError::NoServersAvailable.to_string()).await;
    }
    let group_names: Vec<String> = groups.iter().take(10).map(|g| g.name.clone()).collect();
    let Some(choice) = present_choice(ctx, "Pick a server", &group_names).await? else {
        return Ok(());
    };
    let server = groups[choice].representative.clone();

    let maps: Vec<String> = AVAILABLE_MAPS.iter().map(|m| m.to_string()).collect();
    let Some(map_choice) = present_choice(ctx, "Pick a map", &maps).await? else {
        return Ok(());
    };
    let first_map = AVAILABLE_MAPS[map_choice];
    let server_config_id = found.config_id_for_file(config_file_for_map(first_map));

    // A custom connection password books with the stock admin secret;
    // otherwise the secret comes in over DM.
    let rcon = if request.custom_password {
        DEFAULT_RCON.to_string()
    } else {
        match prompt_secret(ctx, "Provide the RCON password for your reservation.").await {
            Ok(secret) => secret,
            Err(e) => return send_error(ctx, e.to_string()).await,
        }
    };

    let confirmed = match data
        .serveme
        .create_reservation(&CreateReservation {
            starts_at: request.start,
            ends_at: request.end,
            server_id: server.id,
            password: &request.password,
            rcon: &rcon,
            first_map,
            server_config_id,
        })
        .await
    {
        Ok(confirmed) => confirmed,
        Err(e) => return send_error(ctx, e.to_string()).await,
    };

    info!(
        reservation_id = confirmed.id,
        server = %confirmed.server.name,
        user = %author.name,
        "reservation booked"
    );

    let record = ReservationRecord {
        reservation_id: Some(confirmed.id),
        start: request.start,
        end: request.end,
        server_name: confirmed.server.name.clone(),
        ip_and_port: confirmed.server.ip_and_port.clone(),
        password: confirmed.password.clone(),
        rcon: rcon.clone(),
        creator_id: author.id.get(),
        creator_name: author.name.clone(),
    };
    data.store.append(record.clone());

    let start_label = request.start.format("%Y-%m-%d %H:%M");
    let open_notice = format!(
        "**Server:** {}\n**Connect info:**\n```\nconnect {}; password \"{}\"\n```\nOpen since {} (Paris)",
        record.server_name, record.ip_and_port, record.password, start_label
    );

    if request.starts_now {
        send_success(ctx, "🔔 Server open", open_notice.clone()).await?;
    } else {
        send_success(
            ctx,
            "✅ Reservation confirmed",
            format!(
                "{} your reservation is confirmed!\n\n**Server:** {}\n**Start:** {} (Paris)\n**Connect info:**\n```\nconnect {}; password \"{}\"\n```\nRCON sent by DM.",
                author.mention(),
                record.server_name,
                start_label,
                record.ip_and_port,
                record.password
            ),
        )
        .await?;
    }

    let rcon_embed = CreateEmbed::new()
        .title(format!("RCON for {}", record.server_name))
        .description(format!(
            "```\nrcon_address {}; rcon_password \"{}\"\n```",
            record.ip_and_port, record.rcon
        ))
        .colour(Colour::BLUE);
    if author
        .dm(ctx.serenity_context(), CreateMessage::new().embed(rcon_embed))
        .await
        .is_err()
    {
        send_error(ctx, MSG_DM_BLOCKED).await?;
    }

    let now = Utc::now().with_timezone(&TIMEZONE);
    if !request.starts_now && record.start > now {
        let delay = (record.start - now).to_std().unwrap_or_default();
        let serenity_ctx = ctx.serenity_context().clone();
        let channel_id = ctx.channel_id();
        data.notifier
            .schedule(confirmed.id, delay, async move {
                let embed = CreateEmbed::new()
                    .title("🔔 Server open")
                    .description(open_notice)
                    .colour(Colour::DARK_GREEN);
                if let Err(e) = channel_id
                    .send_message(&serenity_ctx, CreateMessage::new().embed(embed))
                    .await
                {
                    tracing::warn!("failed to deliver the open notification: {e}");
                }
            });
    }

    Ok(())
}
