//! Remote administration commands, all funneled through the credential
//! gate and the console relay.

use chrono::Utc;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateMessage};
use tracing::info;

use crate::config::{AVAILABLE_MAPS, MSG_DM_BLOCKED, MSG_NO_RESERVATION, SERVER_CONFIG_FILES, TIMEZONE};
use crate::error::BotError;
use crate::interact::{present_choice, send_error, send_info, send_success};
use crate::modules::reservation::store::LookupTarget;
use crate::modules::server::{console, gate};
use crate::{Context, Error};

enum ConsoleAction {
    ChangeLevel,
    Exec,
}

impl ConsoleAction {
    fn verb(&self) -> &'static str {
        match self {
            Self::ChangeLevel => "changelevel",
            Self::Exec => "exec",
        }
    }

    fn menu_title(&self) -> &'static str {
        match self {
            Self::ChangeLevel => "Pick a new map",
            Self::Exec => "Pick a configuration",
        }
    }

    fn options(&self) -> Vec<String> {
        match self {
            Self::ChangeLevel => AVAILABLE_MAPS.iter().map(|m| m.to_string()).collect(),
            Self::Exec => SERVER_CONFIG_FILES.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn success(&self, argument: &str, response: &str) -> (String, String) {
        match self {
            Self::ChangeLevel => (
                "✅ Map changed".to_string(),
                format!("Now running **{argument}**.\nServer response: `{response}`"),
            ),
            Self::Exec => (
                "✅ Configuration executed".to_string(),
                format!("Executed **{argument}**.\nServer response: `{response}`"),
            ),
        }
    }
}

/// Change the active map on a reserved server.
#[poise::command(prefix_command)]
pub async fn changelevel(
    ctx: Context<'_>,
    target: Option<String>,
    map: Option<String>,
) -> Result<(), Error> {
    run_console_action(ctx, target, map, ConsoleAction::ChangeLevel).await
}

/// Execute a named server configuration.
#[poise::command(prefix_command)]
pub async fn exec(
    ctx: Context<'_>,
    target: Option<String>,
    config: Option<String>,
) -> Result<(), Error> {
    run_console_action(ctx, target, config, ConsoleAction::Exec).await
}

async fn run_console_action(
    ctx: Context<'_>,
    target_arg: Option<String>,
    trailing: Option<String>,
    action: ConsoleAction,
) -> Result<(), Error> {
    // A first token that is neither a mention nor an id is the map/config.
    let (target, argument) = match target_arg {
        None => (LookupTarget::Requester, trailing),
        Some(token) => match LookupTarget::parse(&token) {
            Some(target) => (target, trailing),
            None => (LookupTarget::Requester, Some(token)),
        },
    };

    let data = ctx.data();
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

    let argument = match argument {
        Some(argument) => argument,
        None => {
            let options = action.options();
            match present_choice(ctx, action.menu_title(), &options).await? {
                Some(index) => options[index].clone(),
                None => return Ok(()),
            }
        }
    };

    let command = format!("{} {}", action.verb(), argument);
    match console::run(&record.ip_and_port, &record.rcon, &command).await {
        Ok(response) => {
            info!(
                reservation_id = record.reservation_id.unwrap_or_default(),
                %command,
                "console command executed"
            );
            let (title, body) = action.success(&argument, &console::truncate_response(&response));
            send_success(ctx, title, body).await
        }
        Err(e) => send_error(ctx, e.to_string()).await,
    }
}

/// DM the invoker the RCON credentials of their own reservation.
#[poise::command(prefix_command)]
pub async fn rcon(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let records = data.store.confirmed_for(ctx.author().id.get());
    let Some(record) = records.first() else {
        return send_error(ctx, MSG_NO_RESERVATION).await;
    };

    let embed = CreateEmbed::new()
        .title(format!("RCON for {}", record.server_name))
        .description(format!(
            "```\nrcon_address {}; rcon_password \"{}\"\n```",
            record.ip_and_port, record.rcon
        ))
        .colour(Colour::BLUE);
    match ctx
        .author()
        .dm(ctx.serenity_context(), CreateMessage::new().embed(embed))
        .await
    {
        Ok(_) => send_info(ctx, "RCON sent by DM.").await,
        Err(_) => send_error(ctx, MSG_DM_BLOCKED).await,
    }
}
