//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use tracing::{debug, info};

use crate::screen::ScreenId;

use super::controller::{ChatKind, MenuController, Reply};
use super::request_context;
use super::ui_builder::{compose_message_text, create_screen_keyboard};

/// A slash command addressed to this bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(ScreenId),
    /// `/qoshish Service | Phone`
    Add(String),
    /// `/ochirish Service`
    Delete(String),
    Unknown(String),
}

impl Command {
    /// Parse `text` as a command. Returns `None` for plain text and for
    /// commands addressed to another bot (`/start@OtherBot`).
    pub fn parse(text: &str, bot_username: &str) -> Option<Command> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (head, args) = match body.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (body, ""),
        };

        let name = match head.split_once('@') {
            Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => head,
        };

        let command = match name.to_lowercase().as_str() {
            "start" | "help" | "yordam" => Command::Open(ScreenId::Main),
            "aloqa" | "contact" | "kontakt" => Command::Open(ScreenId::Contacts),
            "top" => Command::Open(ScreenId::Top),
            "id" => Command::Open(ScreenId::MyInfo),
            "about" => Command::Open(ScreenId::About),
            "admin" => Command::Open(ScreenId::Admin),
            "qoshish" | "add" if args.is_empty() => Command::Open(ScreenId::AdminAdd),
            "qoshish" | "add" => Command::Add(args.to_string()),
            "ochirish" | "delete" | "remove" if args.is_empty() => {
                Command::Open(ScreenId::AdminDelete)
            }
            "ochirish" | "delete" | "remove" => Command::Delete(args.to_string()),
            _ => Command::Unknown(format!("/{name}")),
        };
        Some(command)
    }
}

/// Commands shown in the Telegram client menu
pub fn bot_commands() -> Vec<BotCommand> {
    [
        ("start", "cmd-start"),
        ("aloqa", "cmd-aloqa"),
        ("top", "cmd-top"),
        ("id", "cmd-id"),
        ("yordam", "cmd-yordam"),
    ]
    .into_iter()
    .map(|(command, key)| BotCommand::new(command, crate::localization::t(key)))
    .collect()
}

/// Send a controller reply as a new message
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<Option<Message>> {
    let notice = reply.notice.as_ref().map(|n| n.text());
    let Some(text) = compose_message_text(notice, reply.screen.as_ref()) else {
        return Ok(None);
    };

    let mut request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    if let Some(screen) = &reply.screen {
        request = request.reply_markup(create_screen_keyboard(screen));
    }

    Ok(Some(request.await?))
}

pub async fn message_handler(bot: Bot, msg: Message, controller: Arc<MenuController>) -> Result<()> {
    let Some(user) = &msg.from else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let ctx = request_context(&msg.chat, user);
    let settings = controller.settings();

    let chat_allowed = match ctx.chat_kind {
        ChatKind::Private => true,
        ChatKind::Group | ChatKind::Supergroup => settings.is_allowed_chat(ctx.chat_id),
        ChatKind::Channel => false,
    };
    if !chat_allowed {
        debug!(chat_id = ctx.chat_id, "Ignoring message from chat that is not allowed");
        return Ok(());
    }

    let reply = match Command::parse(text, &settings.bot_username) {
        Some(Command::Open(screen)) => {
            debug!(user_id = ctx.user_id, screen = %screen, "Command received");
            controller.open(&ctx, screen).await
        }
        Some(Command::Add(input)) => controller.add_contact(&ctx, &input).await,
        Some(Command::Delete(service)) => controller.delete_contact(&ctx, &service).await,
        Some(Command::Unknown(command)) => {
            info!(user_id = ctx.user_id, command = %command, "Unknown command");
            controller.unknown_command(&ctx, &command)
        }
        None if ctx.chat_kind.is_group() && settings.is_admin(ctx.user_id) && text.contains('|') => {
            controller.add_contact(&ctx, text).await
        }
        None => return Ok(()),
    };

    send_reply(&bot, msg.chat.id, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "MahallaYordamBot";

    #[test]
    fn test_command_aliases() {
        for text in ["/start", "/help", "/yordam", "/START"] {
            assert_eq!(Command::parse(text, BOT), Some(Command::Open(ScreenId::Main)));
        }
        for text in ["/aloqa", "/contact", "/kontakt"] {
            assert_eq!(
                Command::parse(text, BOT),
                Some(Command::Open(ScreenId::Contacts))
            );
        }
        assert_eq!(Command::parse("/id", BOT), Some(Command::Open(ScreenId::MyInfo)));
    }

    #[test]
    fn test_command_with_bot_mention() {
        assert_eq!(
            Command::parse("/top@mahallayordambot", BOT),
            Some(Command::Open(ScreenId::Top))
        );
        assert_eq!(Command::parse("/top@OtherBot", BOT), None);
    }

    #[test]
    fn test_add_and_delete_arguments() {
        assert_eq!(
            Command::parse("/qoshish Tez yordam | 103", BOT),
            Some(Command::Add("Tez yordam | 103".to_string()))
        );
        assert_eq!(
            Command::parse("/add", BOT),
            Some(Command::Open(ScreenId::AdminAdd))
        );
        assert_eq!(
            Command::parse("/ochirish  Elektrik usta ", BOT),
            Some(Command::Delete("Elektrik usta".to_string()))
        );
        assert_eq!(
            Command::parse("/remove", BOT),
            Some(Command::Open(ScreenId::AdminDelete))
        );
    }

    #[test]
    fn test_plain_text_and_unknown() {
        assert_eq!(Command::parse("Usta | 901234567", BOT), None);
        assert_eq!(
            Command::parse("/foo bar", BOT),
            Some(Command::Unknown("/foo".to_string()))
        );
    }

    #[test]
    fn test_bot_commands_are_localized() {
        let commands = bot_commands();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0].command, "start");
        assert!(!commands[0].description.starts_with("Missing translation"));
    }
}
