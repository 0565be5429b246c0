//! # Screen Module
//!
//! Closed set of screens the bot can show, the button actions that lead between
//! them, and the transport-neutral shape of a rendered screen.
//!
//! Callback payloads on the wire:
//!
//! | payload              | action                         |
//! |----------------------|--------------------------------|
//! | `menu:<name>`        | open a top level screen        |
//! | `admin:add`          | open the add-contact help      |
//! | `admin:delete`       | open the delete list           |
//! | `contact:<service>`  | select a contact (counts a click) |
//! | `showphone:<phone>`  | reveal a number for copying    |
//! | `delete:<service>`   | delete a contact               |
//! | `back`               | return to the previous screen  |

use std::fmt;

/// Telegram rejects callback data longer than this many bytes
pub const MAX_CALLBACK_DATA: usize = 64;

/// Identifier of a screen, as stored in menu history
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenId {
    Main,
    Contacts,
    Top,
    About,
    MyInfo,
    Admin,
    AdminAdd,
    AdminDelete,
    /// Detail view of one contact
    Contact(String),
    /// Full number shown for copying
    ShowPhone(String),
}

impl ScreenId {
    /// Home screen used when there is no history to go back to
    pub const HOME: ScreenId = ScreenId::Main;

    /// Only admins may see this screen
    pub fn requires_admin(&self) -> bool {
        matches!(self, ScreenId::Admin | ScreenId::AdminAdd | ScreenId::AdminDelete)
    }

    /// Screen reads contacts and needs an allowed group as its scope
    pub fn requires_group(&self) -> bool {
        !matches!(self, ScreenId::Main | ScreenId::About | ScreenId::MyInfo)
    }

    /// Callback payload that opens this screen
    pub fn callback_data(&self) -> String {
        match self {
            ScreenId::AdminAdd | ScreenId::AdminDelete => self.to_string(),
            ScreenId::Contact(_) | ScreenId::ShowPhone(_) => self.to_string(),
            _ => format!("menu:{self}"),
        }
    }

    /// Parse a history identifier produced by `Display`
    pub fn parse(id: &str) -> Option<ScreenId> {
        let screen = match id {
            "main" => ScreenId::Main,
            "contacts" => ScreenId::Contacts,
            "top" => ScreenId::Top,
            "about" => ScreenId::About,
            "my-info" => ScreenId::MyInfo,
            "admin" => ScreenId::Admin,
            "admin:add" => ScreenId::AdminAdd,
            "admin:delete" => ScreenId::AdminDelete,
            _ => {
                if let Some(service) = non_empty_suffix(id, "contact:") {
                    ScreenId::Contact(service.to_string())
                } else if let Some(phone) = non_empty_suffix(id, "showphone:") {
                    ScreenId::ShowPhone(phone.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(screen)
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenId::Main => write!(f, "main"),
            ScreenId::Contacts => write!(f, "contacts"),
            ScreenId::Top => write!(f, "top"),
            ScreenId::About => write!(f, "about"),
            ScreenId::MyInfo => write!(f, "my-info"),
            ScreenId::Admin => write!(f, "admin"),
            ScreenId::AdminAdd => write!(f, "admin:add"),
            ScreenId::AdminDelete => write!(f, "admin:delete"),
            ScreenId::Contact(service) => write!(f, "contact:{service}"),
            ScreenId::ShowPhone(phone) => write!(f, "showphone:{phone}"),
        }
    }
}

fn non_empty_suffix<'a>(data: &'a str, prefix: &str) -> Option<&'a str> {
    data.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

/// What a button press asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open(ScreenId),
    Delete(String),
    Back,
}

impl Action {
    /// Decode callback data. Unknown payloads yield `None`.
    pub fn parse(data: &str) -> Option<Action> {
        if data == "back" {
            return Some(Action::Back);
        }

        if let Some(menu) = data.strip_prefix("menu:") {
            let screen = match menu {
                "main" => ScreenId::Main,
                "contacts" => ScreenId::Contacts,
                "top" => ScreenId::Top,
                "about" => ScreenId::About,
                // older keyboards still carry `menu:id`
                "my-info" | "id" => ScreenId::MyInfo,
                "admin" => ScreenId::Admin,
                _ => return None,
            };
            return Some(Action::Open(screen));
        }

        if let Some(service) = non_empty_suffix(data, "delete:") {
            return Some(Action::Delete(service.to_string()));
        }

        match data {
            "admin:add" | "admin:delete" => ScreenId::parse(data).map(Action::Open),
            _ if data.starts_with("contact:") || data.starts_with("showphone:") => {
                ScreenId::parse(data).map(Action::Open)
            }
            _ => None,
        }
    }

    pub fn callback_data(&self) -> String {
        match self {
            Action::Open(screen) => screen.callback_data(),
            Action::Delete(service) => format!("delete:{service}"),
            Action::Back => "back".to_string(),
        }
    }
}

/// What happens when a button is pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    Action(Action),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub kind: ButtonKind,
}

impl Button {
    pub fn action(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Action(action),
        }
    }

    pub fn open(label: impl Into<String>, screen: ScreenId) -> Self {
        Self::action(label, Action::Open(screen))
    }

    pub fn back(label: impl Into<String>) -> Self {
        Self::action(label, Action::Back)
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Url(url.into()),
        }
    }
}

/// Rendered screen: HTML text and rows of buttons
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    pub text: String,
    pub rows: Vec<Vec<Button>>,
}

impl Screen {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn button(self, button: Button) -> Self {
        self.row(vec![button])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Actions reachable from this screen, in display order
    pub fn actions(&self) -> Vec<&Action> {
        self.buttons()
            .filter_map(|b| match &b.kind {
                ButtonKind::Action(action) => Some(action),
                ButtonKind::Url(_) => None,
            })
            .collect()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.buttons()
            .filter_map(|b| match &b.kind {
                ButtonKind::Url(url) => Some(url.as_str()),
                ButtonKind::Action(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_ids_round_trip_through_history_format() {
        let screens = [
            ScreenId::Main,
            ScreenId::Contacts,
            ScreenId::Top,
            ScreenId::About,
            ScreenId::MyInfo,
            ScreenId::Admin,
            ScreenId::AdminAdd,
            ScreenId::AdminDelete,
            ScreenId::Contact("Tez yordam".to_string()),
            ScreenId::ShowPhone("+998901234567".to_string()),
        ];
        for screen in screens {
            assert_eq!(ScreenId::parse(&screen.to_string()), Some(screen.clone()));
            assert_eq!(
                Action::parse(&screen.callback_data()),
                Some(Action::Open(screen))
            );
        }
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("back"), Some(Action::Back));
        assert_eq!(
            Action::parse("menu:id"),
            Some(Action::Open(ScreenId::MyInfo))
        );
        assert_eq!(
            Action::parse("delete:Gaz: avariya"),
            Some(Action::Delete("Gaz: avariya".to_string()))
        );
        assert_eq!(
            Action::parse("contact:Gaz: avariya"),
            Some(Action::Open(ScreenId::Contact("Gaz: avariya".to_string())))
        );
        assert_eq!(Action::parse("menu:unknown"), None);
        assert_eq!(Action::parse("contact:"), None);
        assert_eq!(Action::parse("delete:"), None);
        assert_eq!(Action::parse("admin:other"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_gating() {
        assert!(ScreenId::Admin.requires_admin());
        assert!(ScreenId::AdminDelete.requires_admin());
        assert!(!ScreenId::Contacts.requires_admin());

        assert!(!ScreenId::Main.requires_group());
        assert!(!ScreenId::About.requires_group());
        assert!(!ScreenId::MyInfo.requires_group());
        assert!(ScreenId::Top.requires_group());
        assert!(ScreenId::Contact("x".to_string()).requires_group());
    }
}
