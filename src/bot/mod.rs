//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `controller`: Screen rendering, permission gating and menu history
//! - `message_handler`: Handles commands and admin text input
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `membership_handler`: Reacts to the bot being added to chats
//! - `ui_builder`: Converts rendered screens into Telegram keyboards

pub mod callback_handler;
pub mod controller;
pub mod membership_handler;
pub mod message_handler;
pub mod ui_builder;

use teloxide::types::{Chat, User};

pub use callback_handler::callback_handler;
pub use controller::{ChatKind, MenuController, Notice, Reply, RequestContext};
pub use membership_handler::membership_handler;
pub use message_handler::message_handler;

/// Kind of a Telegram chat
pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    }
}

/// Build the controller's view of who sent an update and where
pub fn request_context(chat: &Chat, user: &User) -> RequestContext {
    RequestContext::new(user.id.0 as i64, chat.id.0, chat_kind(chat))
        .with_username(user.username.clone())
}
