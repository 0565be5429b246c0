//! UI Builder module for turning rendered screens into Telegram keyboards

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

use crate::screen::{Button, ButtonKind, Screen, MAX_CALLBACK_DATA};

/// Convert one button, dropping it if Telegram would reject it
fn to_inline_button(button: &Button) -> Option<InlineKeyboardButton> {
    match &button.kind {
        ButtonKind::Action(action) => {
            let data = action.callback_data();
            if data.len() > MAX_CALLBACK_DATA {
                warn!(label = %button.label, bytes = data.len(), "Callback data too long, button dropped");
                return None;
            }
            Some(InlineKeyboardButton::callback(button.label.clone(), data))
        }
        ButtonKind::Url(raw) => match Url::parse(raw) {
            Ok(url) => Some(InlineKeyboardButton::url(button.label.clone(), url)),
            Err(e) => {
                warn!(label = %button.label, url = %raw, error = %e, "Invalid button URL, button dropped");
                None
            }
        },
    }
}

/// Create the inline keyboard for a rendered screen
pub fn create_screen_keyboard(screen: &Screen) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = screen
        .rows
        .iter()
        .map(|row| row.iter().filter_map(to_inline_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();

    InlineKeyboardMarkup::new(rows)
}

/// Text of a screen sent as a new message, with any notice shown above it
pub fn compose_message_text(notice: Option<&str>, screen: Option<&Screen>) -> Option<String> {
    match (notice, screen) {
        (Some(notice), Some(screen)) => Some(format!("{notice}\n\n{}", screen.text)),
        (None, Some(screen)) => Some(screen.text.clone()),
        (Some(notice), None) => Some(notice.to_string()),
        (None, None) => None,
    }
}
