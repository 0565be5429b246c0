//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, error, warn};

use crate::localization::t;
use crate::screen::Action;

use super::controller::{MenuController, Notice, Reply};
use super::request_context;
use super::ui_builder::create_screen_keyboard;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<MenuController>,
) -> Result<()> {
    let data = q.data.as_deref().unwrap_or_default();
    debug!(user_id = %q.from.id, data, "Received callback query");

    let Some(message) = &q.message else {
        // Too old to edit, nothing to update
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let ctx = request_context(message.chat(), &q.from);
    let reply = match Action::parse(data) {
        Some(action) => controller.handle_action(&ctx, action).await,
        None => {
            warn!(user_id = ctx.user_id, data, "Unknown callback payload");
            Reply::alert(t("unknown-action"))
        }
    };

    if let Some(screen) = &reply.screen {
        let result = bot
            .edit_message_text(message.chat().id, message.id(), screen.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(create_screen_keyboard(screen))
            .await;

        match result {
            Ok(_) => (),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(user_id = ctx.user_id, "Screen unchanged, edit skipped");
            }
            Err(e) => {
                error!(user_id = ctx.user_id, chat_id = ctx.chat_id, error = %e, "Failed to edit menu message");
            }
        }
    }

    // Answer the callback query to remove the loading state
    let answer = bot.answer_callback_query(q.id.clone());
    match reply.notice {
        Some(Notice::Toast(text)) => answer.text(text).await?,
        Some(Notice::Alert(text)) => answer.text(text).show_alert(true).await?,
        None => answer.await?,
    };

    Ok(())
}
