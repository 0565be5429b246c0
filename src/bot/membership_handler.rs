//! Membership Handler module: keeps the bot out of chats it was not meant for

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tracing::{debug, info, warn};

use super::controller::{ChatKind, MenuController, Reply};
use super::chat_kind;
use super::message_handler::send_reply;

/// React to the bot's own membership changing in a chat
pub async fn membership_handler(
    bot: Bot,
    update: ChatMemberUpdated,
    controller: Arc<MenuController>,
) -> Result<()> {
    let chat_id = update.chat.id;
    let was_present = update.old_chat_member.kind.is_present();
    let is_present = update.new_chat_member.kind.is_present();

    if !is_present {
        info!(chat_id = %chat_id, "Bot removed from chat");
        return Ok(());
    }
    if was_present {
        debug!(chat_id = %chat_id, "Membership changed without joining");
        return Ok(());
    }

    let kind = chat_kind(&update.chat);
    info!(chat_id = %chat_id, chat_type = %kind, "Bot added to chat");

    match kind {
        ChatKind::Private => Ok(()),
        ChatKind::Channel => {
            bot.leave_chat(chat_id).await?;
            warn!(chat_id = %chat_id, "Added to a channel, left");
            Ok(())
        }
        ChatKind::Group | ChatKind::Supergroup => {
            if !controller.settings().is_allowed_chat(chat_id.0) {
                bot.leave_chat(chat_id).await?;
                warn!(chat_id = %chat_id, "Added to a group that is not allowed, left");
                return Ok(());
            }

            let welcome = controller.welcome(update.from.id.0 as i64);
            let Some(sent) = send_reply(&bot, chat_id, Reply::screen(welcome)).await? else {
                return Ok(());
            };

            if let Err(e) = bot
                .pin_chat_message(chat_id, sent.id)
                .disable_notification(true)
                .await
            {
                warn!(chat_id = %chat_id, error = %e, "Failed to pin welcome message");
            }
            Ok(())
        }
    }
}
