// Guild-event handlers for membership sync.
//
// Called from the event dispatch in main. These translate gateway payloads
// into core service calls and log the outcome; a failed sync must never
// take the event loop down, so errors stop here.

use crate::discord::Data;
use poise::serenity_prelude as serenity;

/// Register every roster member the store doesn't know yet.
///
/// Fires once per guild on startup and again whenever the bot is invited
/// somewhere new, so it has to tolerate an already-populated store.
pub async fn handle_guild_create(
    ctx: &serenity::Context,
    data: &Data,
    guild: &serenity::Guild,
) {
    let bot_id = ctx.cache.current_user().id.get();
    let roster: Vec<u64> = guild.members.keys().map(|id| id.get()).collect();

    match data.progression.sync_roster(&roster, bot_id).await {
        Ok(0) => {
            tracing::debug!(guild_id = guild.id.get(), "roster already in sync");
        }
        Ok(added) => {
            tracing::info!(
                guild_id = guild.id.get(),
                added,
                "registered unseen guild members"
            );
        }
        Err(err) => {
            tracing::error!("Error syncing guild roster: {}", err);
        }
    }
}

/// Register a single freshly joined member.
pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) {
    let user_id = member.user.id.get();
    if user_id == ctx.cache.current_user().id.get() {
        return;
    }

    match data.progression.register_member(user_id).await {
        Ok(true) => {
            tracing::info!(user_id, "registered joining member");
        }
        Ok(false) => {
            tracing::debug!(user_id, "joining member already registered");
        }
        Err(err) => {
            tracing::error!("Error registering joining member: {}", err);
        }
    }
}
