// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Route gateway events to the membership handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::progression::ProgressionService;
use crate::discord::commands::progression as progression_commands;
use crate::discord::member_sync;
use crate::discord::{Data, Error};
use crate::infra::progression::SqliteUserStore;
use poise::serenity_prelude as serenity;

/// Event handler for non-command Discord events: the two guild membership
/// events that keep the user roster in sync. Everything else is ignored.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildCreate { guild, .. } => {
            member_sync::handle_guild_create(ctx, data, guild).await;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            member_sync::handle_member_join(ctx, data, new_member).await;
        }
        _ => {}
    }

    Ok(())
}

/// Framework-level failures. Command bodies answer the user themselves, so
/// all that's left here is operator logging; an unrecognized `!command` is
/// deliberately a no-op.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                "Command failed: {}",
                error
            );
        }
        poise::FrameworkError::UnknownCommand { .. } => {
            tracing::debug!("Ignoring unrecognized command");
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep the runtime database in a dedicated folder so the repo root stays
    // tidy. The store creates the file and folder on first run.
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/users.db".to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    use std::sync::Arc;

    // Create the SQLite-backed user store
    let user_store = SqliteUserStore::new(&database_path)
        .await
        .expect("Failed to initialize SQLite store");

    // Create the progression service with the store injected and wrap in Arc
    let progression_service = Arc::new(ProgressionService::new(user_store));

    // Create the data structure that will be shared across all commands
    let data = Data {
        progression: Arc::clone(&progression_service),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![progression_commands::status(), progression_commands::levelup()],
            // Classic message commands: `!status`, `!levelup`. No slash-command
            // registration needed, the prefix is matched locally.
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".to_string()),
                mention_as_prefix: false,
                ..Default::default()
            },
            // Event handler for guild membership events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|_ctx, ready, _framework| {
            Box::pin(async move {
                println!("Bot is now running as {}. Press CTRL-C to exit.", ready.user.name);
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    // Close the gateway session cleanly on CTRL-C instead of dying mid-event.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to register CTRL-C handler");
        shard_manager.shutdown_all().await;
    });

    client.start().await.expect("Error running bot");
}
