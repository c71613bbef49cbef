// Discord commands for the progression system.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::progression::{PlayerStats, ProgressionError, ProgressionService};
use crate::infra::progression::SqliteUserStore;

/// Show the caller's full stat sheet.
#[poise::command(prefix_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author();

    match ctx.data().progression.status(author.id.get()).await {
        Ok(stats) => {
            ctx.say(format_status_reply(&author.name, &stats)).await?;
        }
        Err(err) => {
            // An unregistered caller is an expected miss, not an anomaly;
            // everything else is operator-facing.
            match &err {
                ProgressionError::NotFound(_) => {
                    tracing::debug!(user_id = author.id.get(), "status for unknown user");
                }
                other => tracing::error!("Error getting user information: {}", other),
            }
            ctx.say("Error getting user information").await?;
        }
    }

    Ok(())
}

/// Advance the caller one level.
#[poise::command(prefix_command)]
pub async fn levelup(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author();

    match ctx.data().progression.level_up(author.id.get()).await {
        Ok(()) => {
            ctx.say(format!("{} has successfully leveled up", author.name))
                .await?;
        }
        Err(err) => {
            match &err {
                ProgressionError::NotFound(_) => {
                    tracing::debug!(user_id = author.id.get(), "level-up for unknown user");
                }
                other => tracing::error!("Error leveling up: {}", other),
            }
            ctx.say("Error leveling up").await?;
        }
    }

    Ok(())
}

/// The `!status` success reply: the caller's name over their stat sheet.
fn format_status_reply(username: &str, stats: &PlayerStats) -> String {
    format!("{}'s stats\n{}", username, stats)
}

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands and event handlers.
/// This is where we store our services.
use std::sync::Arc;

pub struct Data {
    pub progression: Arc<ProgressionService<SqliteUserStore>>,
}
