use modules::{
    reservation::{
        commands::reserve, notify::Notifier, serveme::ServemeClient, store::SessionStore,
        task::CleanupTask,
    },
    server::commands::{changelevel, exec, rcon},
    system::events::{MentionHelpHandler, ReadyHandler},
    utility::commands::{connect, dispo, end, help, list},
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use std::sync::Arc;
use tasks::TaskManager;
use tracing::{error, info, trace};

mod config;
mod error;
mod events;
mod interact;
mod modules;
mod tasks;

use crate::events::EventManager;

#[derive(Clone)]
pub struct Data {
    pub store: Arc<SessionStore>,
    pub serveme: Arc<ServemeClient>,
    pub notifier: Arc<Notifier>,
    pub task_manager: Arc<TaskManager>,
    pub event_manager: Arc<EventManager>,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data").finish_non_exhaustive()
    }
}

impl Data {
    pub async fn init_tasks(&self, ctx: &serenity::Context) {
        self.task_manager
            .add_task(CleanupTask::new(self.store.clone()))
            .await;
        self.task_manager.start_tasks(ctx.clone()).await;
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("starting reservebot");

    let secrets = config::Secrets::from_env().expect("missing configuration");
    let token = secrets.discord_token.clone();
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            commands: vec![
                reserve(),
                connect(),
                list(),
                end(),
                changelevel(),
                exec(),
                rcon(),
                dispo(),
                help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    trace!(
                        "Command {} used by {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        ctx.guild_id()
                            .map_or_else(|| "DM".to_string(), |id| id.to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command {} completed for {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        ctx.guild_id()
                            .map_or_else(|| "DM".to_string(), |id| id.to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Command {} failed for {} in {}: {:?}",
                                ctx.command().qualified_name,
                                ctx.author().tag(),
                                ctx.guild_id()
                                    .map_or_else(|| "DM".to_string(), |id| id.to_string()),
                                error
                            );
                            let _ = crate::interact::send_error(
                                ctx,
                                "Something went wrong. Try again in a moment.",
                            )
                            .await;
                        }
                        err => error!("Other framework error: {:?}", err),
                    }
                })
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                info!("initializing session state");

                let serveme = Arc::new(ServemeClient::new(secrets.serveme_api_key.clone())?);
                let event_manager = Arc::new(EventManager::new());
                event_manager.add_handler(ReadyHandler).await;
                event_manager.add_handler(MentionHelpHandler).await;

                let data = Data {
                    store: Arc::new(SessionStore::new()),
                    serveme,
                    notifier: Arc::new(Notifier::new()),
                    task_manager: Arc::new(TaskManager::new()),
                    event_manager,
                };
                data.init_tasks(ctx).await;

                Ok(data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await;

    client.unwrap().start().await.unwrap();
}
