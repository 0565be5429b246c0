//! Menu Controller module: turns a requested screen into a rendered one and
//! keeps each user's back-stack in step with what they actually saw.
//!
//! History is only committed after a screen rendered successfully, so a failed
//! render never leaves a phantom entry that "back" would silently skip.

use std::fmt;
use std::sync::Arc;
use teloxide::utils::html::escape;
use tracing::{debug, error, info};

use crate::config::{BotSettings, TOP_CONTACTS_LIMIT};
use crate::db::{ContactStore, GroupId};
use crate::errors::{BotError, BotResult, DenialReason, ValidationError};
use crate::localization::{t, t_args};
use crate::menu_history::{HistoryStack, MenuHistory};
use crate::phone::{
    classify, format_button_label, format_phone_display, is_valid_for_storage,
    parse_contact_input, Classification,
};
use crate::screen::{Action, Button, Screen, ScreenId, MAX_CALLBACK_DATA};

const RANK_MARKERS: [&str; 8] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣"];

const ADD_EXAMPLES: [&str; 4] = [
    "Tez yordam | 103",
    "Elektrik usta | +998901234567",
    "Elektrik usta | 998901234567",
    "Elektrik usta | 901234567",
];

/// Kind of chat a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatKind::Private => write!(f, "private"),
            ChatKind::Group => write!(f, "group"),
            ChatKind::Supergroup => write!(f, "supergroup"),
            ChatKind::Channel => write!(f, "channel"),
        }
    }
}

/// Who asked, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
    pub username: Option<String>,
    pub chat_id: i64,
    pub chat_kind: ChatKind,
}

impl RequestContext {
    pub fn new(user_id: i64, chat_id: i64, chat_kind: ChatKind) -> Self {
        Self {
            user_id,
            username: None,
            chat_id,
            chat_kind,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

/// Short message attached to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Ephemeral acknowledgment
    Toast(String),
    /// Modal alert the user has to dismiss
    Alert(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Toast(text) | Notice::Alert(text) => text,
        }
    }
}

/// Outcome of one request cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Screen to show, `None` keeps the current message as is
    pub screen: Option<Screen>,
    pub notice: Option<Notice>,
}

impl Reply {
    pub fn screen(screen: Screen) -> Self {
        Self {
            screen: Some(screen),
            notice: None,
        }
    }

    pub fn alert(text: String) -> Self {
        Self {
            screen: None,
            notice: Some(Notice::Alert(text)),
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Split and validate admin input `"Service | Phone"`
pub fn validate_contact_input(input: &str) -> Result<(String, String), ValidationError> {
    let (service, phone) = parse_contact_input(input).ok_or(ValidationError::MissingSeparator)?;

    if service.is_empty() {
        return Err(ValidationError::EmptyService);
    }
    if phone.is_empty() {
        return Err(ValidationError::EmptyPhone);
    }
    let delete_payload = Action::Delete(service.clone()).callback_data();
    if delete_payload.len() > MAX_CALLBACK_DATA {
        return Err(ValidationError::ServiceTooLong);
    }
    if !is_valid_for_storage(&phone) {
        return Err(ValidationError::InvalidPhone);
    }

    Ok((service, phone))
}

fn back_button() -> Button {
    Button::back(t("btn-back"))
}

fn fits_callback(action: &Action) -> bool {
    action.callback_data().len() <= MAX_CALLBACK_DATA
}

/// State machine over the bot's screens
#[derive(Clone)]
pub struct MenuController {
    store: Arc<dyn ContactStore>,
    history: MenuHistory,
    settings: Arc<BotSettings>,
}

impl MenuController {
    pub fn new(store: Arc<dyn ContactStore>, settings: BotSettings) -> Self {
        Self {
            store,
            history: MenuHistory::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn history(&self) -> &MenuHistory {
        &self.history
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Dispatch a decoded button press
    pub async fn handle_action(&self, ctx: &RequestContext, action: Action) -> Reply {
        match action {
            Action::Open(screen) => self.open(ctx, screen).await,
            Action::Back => self.back(ctx).await,
            Action::Delete(service) => self.delete_contact(ctx, &service).await,
        }
    }

    /// Navigate to `target`, recording it in the user's history on success.
    ///
    /// Opening a contact detail counts one click for that contact, once the
    /// detail screen has rendered.
    pub async fn open(&self, ctx: &RequestContext, target: ScreenId) -> Reply {
        let mut history = self.history.lock(ctx.user_id).await;

        let scope = match self.authorize(ctx, &target) {
            Ok(scope) => scope,
            Err(e) => return self.error_reply(ctx, &target, e),
        };

        let screen = match self.render(ctx, &target, scope).await {
            Ok(screen) => screen,
            Err(e) => return self.error_reply(ctx, &target, e),
        };

        if let ScreenId::Contact(service) = &target {
            if let Err(e) = self.record_click(service, scope).await {
                return self.error_reply(ctx, &target, e);
            }
        }

        debug!(user_id = ctx.user_id, screen = %target, "Screen opened");
        history.push(target);
        Reply::screen(screen)
    }

    /// Return to the previous screen, or home when there is none.
    ///
    /// Entries that can no longer be shown here (a deleted contact, a group screen
    /// seen from a private chat) are discarded and the next one down is tried.
    pub async fn back(&self, ctx: &RequestContext) -> Reply {
        let mut history = self.history.lock(ctx.user_id).await;

        // A chat that may not use the bot at all leaves history alone
        if let Err(e) = self.authorize(ctx, &ScreenId::HOME) {
            return self.error_reply(ctx, &ScreenId::HOME, e);
        }

        while let Some(previous) = history.previous().cloned() {
            let rendered = match self.authorize(ctx, &previous) {
                Ok(scope) => self.render(ctx, &previous, scope).await,
                Err(e) => Err(e),
            };

            match rendered {
                Ok(screen) => {
                    history.pop_to_previous();
                    debug!(user_id = ctx.user_id, screen = %previous, "Went back");
                    return Reply::screen(screen);
                }
                Err(e @ BotError::Collaborator { .. }) => {
                    return self.error_reply(ctx, &previous, e);
                }
                Err(e) => {
                    debug!(user_id = ctx.user_id, screen = %previous, reason = %e, "Skipping stale history entry");
                    history.discard_previous();
                }
            }
        }

        self.no_history_to_home(ctx, &mut history)
    }

    /// `NoHistory -> Home`: show the home screen and make it the new top
    fn no_history_to_home(&self, ctx: &RequestContext, history: &mut HistoryStack) -> Reply {
        debug!(user_id = ctx.user_id, "No previous screen, going home");
        let screen = self.render_main(ctx);
        history.push(ScreenId::HOME);
        Reply::screen(screen)
    }

    /// Add or update a contact from admin input `"Service | Phone"`
    pub async fn add_contact(&self, ctx: &RequestContext, input: &str) -> Reply {
        let _history = self.history.lock(ctx.user_id).await;
        let target = ScreenId::AdminAdd;

        let group = match self.authorize(ctx, &target).and_then(require_group) {
            Ok(group) => group,
            Err(e) => return self.error_reply(ctx, &target, e),
        };

        let (service, phone) = match validate_contact_input(input) {
            Ok(parsed) => parsed,
            Err(e) => return self.error_reply(ctx, &target, e.into()),
        };

        match self.store.upsert_contact(&service, &phone, group).await {
            Ok(true) => {
                info!(user_id = ctx.user_id, group_id = group, service = %service, "Contact saved by admin");
                Reply::screen(render_contact_saved(&service, &phone))
            }
            Ok(false) => Reply::screen(
                Screen::new(format!("{}\n\n{}", t("add-failed"), t("failure-hint")))
                    .button(back_button()),
            ),
            Err(e) => self.error_reply(ctx, &target, BotError::collaborator("upsert_contact", e)),
        }
    }

    /// Delete a contact and show the refreshed delete list
    pub async fn delete_contact(&self, ctx: &RequestContext, service: &str) -> Reply {
        let mut history = self.history.lock(ctx.user_id).await;
        let target = ScreenId::AdminDelete;

        let scope = match self.authorize(ctx, &target) {
            Ok(scope) => scope,
            Err(e) => return self.error_reply(ctx, &target, e),
        };
        let group = match require_group(scope) {
            Ok(group) => group,
            Err(e) => return self.error_reply(ctx, &target, e),
        };

        let notice = match self.store.delete_contact(service, group).await {
            Ok(true) => {
                info!(user_id = ctx.user_id, group_id = group, service, "Contact deleted by admin");
                Notice::Toast(t("delete-done-toast"))
            }
            Ok(false) => Notice::Alert(t("delete-not-found")),
            Err(e) => {
                return self.error_reply(ctx, &target, BotError::collaborator("delete_contact", e))
            }
        };

        match self.render(ctx, &target, scope).await {
            Ok(screen) => {
                history.push(target);
                Reply::screen(screen).with_notice(notice)
            }
            Err(e) => self.error_reply(ctx, &target, e),
        }
    }

    /// Reply for a `/command` the bot does not know
    pub fn unknown_command(&self, ctx: &RequestContext, command: &str) -> Reply {
        let text = [
            t_args("unknown-command", &[("command", escape(command).as_str())]),
            main_command_lines(),
            t("unknown-command-hint"),
        ]
        .join("\n\n");
        let mut screen = Screen::new(text);
        screen.rows = self.main_rows(ctx.user_id);
        Reply::screen(screen)
    }

    /// Message posted when the bot joins an allowed group
    pub fn welcome(&self, inviter_id: i64) -> Screen {
        let text = [
            t("welcome-greeting"),
            t("welcome-attached"),
            t("main-description"),
            main_command_lines(),
            t("main-hint"),
        ]
        .join("\n\n");
        let mut screen = Screen::new(text);
        screen.rows = self.main_rows(inviter_id);
        screen
    }

    fn group_scope(&self, ctx: &RequestContext) -> Option<GroupId> {
        (ctx.chat_kind.is_group() && self.settings.is_allowed_chat(ctx.chat_id))
            .then_some(ctx.chat_id)
    }

    /// Check the requester may see `screen` and resolve the group it is scoped to
    fn authorize(&self, ctx: &RequestContext, screen: &ScreenId) -> BotResult<Option<GroupId>> {
        let scope = self.group_scope(ctx);

        if ctx.chat_kind == ChatKind::Channel || (ctx.chat_kind.is_group() && scope.is_none()) {
            return Err(DenialReason::ChatNotAllowed.into());
        }
        if screen.requires_admin() && !self.settings.is_admin(ctx.user_id) {
            return Err(DenialReason::NotAdmin.into());
        }
        if screen.requires_group() && scope.is_none() {
            return Err(DenialReason::GroupOnly.into());
        }

        Ok(scope)
    }

    async fn record_click(&self, service: &str, scope: Option<GroupId>) -> BotResult<()> {
        let group = require_group(scope)?;
        let found = self
            .store
            .increment_click_count(service, group)
            .await
            .map_err(|e| BotError::collaborator("increment_click_count", e))?;

        if found {
            Ok(())
        } else {
            Err(BotError::NotFound {
                service: service.to_string(),
            })
        }
    }

    fn error_reply(&self, ctx: &RequestContext, target: &ScreenId, err: BotError) -> Reply {
        match err {
            BotError::InputValidation(kind) => {
                debug!(user_id = ctx.user_id, reason = %kind, "Rejected contact input");
                Reply::screen(render_validation_help(kind))
            }
            BotError::PermissionDenied(reason) => {
                info!(
                    user_id = ctx.user_id,
                    chat_id = ctx.chat_id,
                    screen = %target,
                    reason = %reason,
                    "Permission denied"
                );
                Reply::alert(t(reason.message_key()))
            }
            BotError::NotFound { service } => {
                debug!(user_id = ctx.user_id, service = %service, "Contact not found");
                Reply::alert(t("contact-not-found"))
            }
            BotError::Collaborator { operation, source } => {
                error!(
                    operation,
                    user_id = ctx.user_id,
                    chat_id = ctx.chat_id,
                    screen = %target,
                    error = %source,
                    "Screen failed to render"
                );
                Reply::screen(
                    Screen::new(format!("{}\n\n{}", t("failure-title"), t("failure-hint")))
                        .button(back_button()),
                )
                .with_notice(Notice::Toast(t("failure-toast")))
            }
        }
    }

    async fn render(
        &self,
        ctx: &RequestContext,
        screen: &ScreenId,
        scope: Option<GroupId>,
    ) -> BotResult<Screen> {
        match screen {
            ScreenId::Main => Ok(self.render_main(ctx)),
            ScreenId::About => Ok(self.render_about()),
            ScreenId::MyInfo => Ok(self.render_my_info(ctx)),
            ScreenId::Admin => Ok(render_admin()),
            ScreenId::AdminAdd => Ok(render_add_help()),
            ScreenId::Contacts => self.render_contacts(require_group(scope)?).await,
            ScreenId::Top => self.render_top(require_group(scope)?).await,
            ScreenId::AdminDelete => self.render_delete_list(require_group(scope)?).await,
            ScreenId::Contact(service) => {
                self.render_contact(service, require_group(scope)?).await
            }
            ScreenId::ShowPhone(phone) => Ok(render_show_phone(phone)),
        }
    }

    fn main_rows(&self, user_id: i64) -> Vec<Vec<Button>> {
        let mut rows = vec![
            vec![Button::open(t("btn-contacts"), ScreenId::Contacts)],
            vec![Button::open(t("btn-top"), ScreenId::Top)],
            vec![Button::open(t("btn-my-info"), ScreenId::MyInfo)],
            vec![Button::open(t("btn-about"), ScreenId::About)],
        ];
        if self.settings.is_admin(user_id) {
            rows.insert(2, vec![Button::open(t("btn-admin"), ScreenId::Admin)]);
        }
        rows
    }

    fn render_main(&self, ctx: &RequestContext) -> Screen {
        let text = [
            t("main-title"),
            t("main-description"),
            main_command_lines(),
            t("main-hint"),
        ]
        .join("\n\n");
        let mut screen = Screen::new(text);
        screen.rows = self.main_rows(ctx.user_id);
        screen
    }

    fn render_about(&self) -> Screen {
        let dev = &self.settings.dev_username;
        let bot = &self.settings.bot_username;
        let developer = format!(
            "<a href='https://t.me/{}'>{}</a>",
            escape(dev),
            escape(&self.settings.dev_name)
        );
        let bot_link = format!("<a href='https://t.me/{0}'>@{0}</a>", escape(bot));

        let text = [
            t("about-title"),
            t("about-purpose"),
            [
                "about-features-title",
                "about-feature-contacts",
                "about-feature-whatsapp",
                "about-feature-copy",
                "about-feature-top",
                "about-feature-admin",
            ]
            .map(t)
            .join("\n"),
            t_args("about-developer", &[("developer", developer.as_str())]),
            t_args("about-bot", &[("bot", bot_link.as_str())]),
            t("about-feedback"),
        ]
        .join("\n\n");

        let mut screen = Screen::new(text);
        if !dev.is_empty() {
            screen = screen.button(Button::url(t("btn-developer"), format!("https://t.me/{dev}")));
        }
        screen.button(back_button())
    }

    fn render_my_info(&self, ctx: &RequestContext) -> Screen {
        let username = match &ctx.username {
            Some(name) => format!("@{}", escape(name)),
            None => t("myinfo-no-username"),
        };
        let admin_line = if self.settings.is_admin(ctx.user_id) {
            t("myinfo-admin-yes")
        } else {
            t("myinfo-admin-no")
        };

        let lines = [
            t_args("myinfo-chat-id", &[("chat_id", ctx.chat_id.to_string().as_str())]),
            t_args("myinfo-chat-type", &[("chat_type", ctx.chat_kind.to_string().as_str())]),
            t_args("myinfo-user-id", &[("user_id", ctx.user_id.to_string().as_str())]),
            t_args("myinfo-username", &[("username", username.as_str())]),
            admin_line,
        ]
        .join("\n");

        let text = [t("myinfo-title"), lines, t("myinfo-footer")].join("\n\n");
        Screen::new(text).button(back_button())
    }

    async fn render_contacts(&self, group: GroupId) -> BotResult<Screen> {
        let contacts = self
            .store
            .list_contacts(group)
            .await
            .map_err(|e| BotError::collaborator("list_contacts", e))?;

        if contacts.is_empty() {
            let text = format!("{}\n\n{}", t("contacts-empty-title"), t("contacts-empty-hint"));
            return Ok(Screen::new(text).button(back_button()));
        }

        let text = format!(
            "{}\n\n{}",
            t("contacts-title"),
            t_args("contacts-total", &[("count", contacts.len().to_string().as_str())])
        );
        let mut screen = Screen::new(text);
        for (service, phone) in &contacts {
            let action = Action::Open(ScreenId::Contact(service.clone()));
            if fits_callback(&action) {
                let label = format!("📱 {}", format_button_label(service, phone));
                screen = screen.button(Button::action(label, action));
            }
        }

        Ok(screen.row(vec![
            Button::open(t("btn-top-short"), ScreenId::Top),
            back_button(),
        ]))
    }

    async fn render_top(&self, group: GroupId) -> BotResult<Screen> {
        let top = self
            .store
            .top_contacts(TOP_CONTACTS_LIMIT, group)
            .await
            .map_err(|e| BotError::collaborator("top_contacts", e))?;

        if top.is_empty() {
            let text = format!("{}\n\n{}", t("top-empty-title"), t("top-empty-hint"));
            return Ok(Screen::new(text)
                .button(Button::open(t("btn-contacts-list"), ScreenId::Contacts))
                .button(back_button()));
        }

        let mut screen = Screen::new(format!("{}\n\n{}", t("top-title"), t("top-hint")));
        for (rank, (service, phone, clicks)) in top.iter().enumerate() {
            let action = Action::Open(ScreenId::Contact(service.clone()));
            if !fits_callback(&action) {
                continue;
            }
            let marker = RANK_MARKERS
                .get(rank)
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{}.", rank + 1));
            let label = format!("{} {} ({})", marker, format_button_label(service, phone), clicks);
            screen = screen.button(Button::action(label, action));
        }

        Ok(screen.row(vec![
            Button::open(t("btn-all-contacts"), ScreenId::Contacts),
            back_button(),
        ]))
    }

    async fn render_contact(&self, service: &str, group: GroupId) -> BotResult<Screen> {
        let contact = self
            .store
            .get_contact(service, group)
            .await
            .map_err(|e| BotError::collaborator("get_contact", e))?
            .ok_or_else(|| BotError::NotFound {
                service: service.to_string(),
            })?;

        let classification = classify(&contact.phone);
        let hint = if classification.is_short() {
            Some(t("contact-short-hint"))
        } else if classification.is_uzbek_long() {
            Some(t("contact-long-hint"))
        } else {
            None
        };

        let mut text = format!(
            "👤 <b>{}</b>\n\n{}\n<code>{}</code>",
            escape(&contact.service),
            t("contact-phone-label"),
            escape(&contact.phone)
        );
        if let Some(hint) = hint {
            text.push_str("\n\n");
            text.push_str(&hint);
        }

        let mut screen = Screen::new(text);
        if let Some(link) = whatsapp_link(classification) {
            screen = screen.button(Button::url(t("btn-whatsapp"), link));
        }
        let reveal = Action::Open(ScreenId::ShowPhone(contact.phone.clone()));
        if fits_callback(&reveal) {
            screen = screen.button(Button::action(t("btn-show-phone"), reveal));
        }

        Ok(screen.row(vec![
            back_button(),
            Button::open(t("btn-other-contacts"), ScreenId::Contacts),
        ]))
    }

    async fn render_delete_list(&self, group: GroupId) -> BotResult<Screen> {
        let contacts = self
            .store
            .list_contacts_with_clicks(group)
            .await
            .map_err(|e| BotError::collaborator("list_contacts_with_clicks", e))?;

        if contacts.is_empty() {
            return Ok(Screen::new(t("delete-empty")).button(back_button()));
        }

        let mut screen = Screen::new(t("delete-title"));
        for (service, phone, _clicks) in &contacts {
            let action = Action::Delete(service.clone());
            if fits_callback(&action) {
                let label = format!("❌ {}", format_button_label(service, phone));
                screen = screen.button(Button::action(label, action));
            }
        }
        Ok(screen.button(back_button()))
    }
}

fn whatsapp_link(classification: Classification) -> Option<String> {
    if classification.is_uzbek_long() {
        classification.deeplink
    } else {
        None
    }
}

fn require_group(scope: Option<GroupId>) -> BotResult<GroupId> {
    scope.ok_or(BotError::PermissionDenied(DenialReason::GroupOnly))
}

fn main_command_lines() -> String {
    [
        "main-commands-title",
        "main-command-contacts",
        "main-command-top",
        "main-command-id",
        "main-command-help",
    ]
    .map(t)
    .join("\n")
}

fn render_admin() -> Screen {
    let text = [
        t("admin-title"),
        t("admin-functions"),
        t("admin-function-manage"),
        t("admin-hint"),
    ]
    .join("\n\n");

    Screen::new(text)
        .button(Button::open(t("btn-add-contact"), ScreenId::AdminAdd))
        .button(Button::open(t("btn-delete-contact"), ScreenId::AdminDelete))
        .button(Button::open(t("btn-contacts-list"), ScreenId::Contacts))
        .button(back_button())
}

fn format_examples() -> String {
    ADD_EXAMPLES
        .iter()
        .map(|example| format!("<code>{example}</code>"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_add_help() -> Screen {
    let text = format!(
        "{}\n{}\n\n{}\n{}",
        t("add-format-title"),
        t("add-format-pattern"),
        t("add-examples-title"),
        format_examples()
    );
    Screen::new(text).button(back_button())
}

fn render_validation_help(kind: ValidationError) -> Screen {
    let text = match kind {
        ValidationError::InvalidPhone => format!(
            "{}\n\n{}\n{}\n{}",
            t(kind.message_key()),
            t("formats-title"),
            t("formats-short"),
            t("formats-long")
        ),
        _ => format!(
            "{}\n\n{}\n{}\n\n{}\n{}",
            t(kind.message_key()),
            t("add-format-title"),
            t("add-format-pattern"),
            t("add-examples-title"),
            format_examples()
        ),
    };
    Screen::new(text).button(back_button())
}

fn render_contact_saved(service: &str, phone: &str) -> Screen {
    let text = format!(
        "{}\n\n{}\n{}\n\n{}",
        t("add-done-title"),
        t_args("add-done-service", &[("service", escape(service).as_str())]),
        t_args("add-done-phone", &[("phone", escape(phone).as_str())]),
        t("add-done-hint")
    );
    Screen::new(text)
        .button(Button::open(t("btn-contacts-list"), ScreenId::Contacts))
        .button(back_button())
}

fn render_show_phone(phone: &str) -> Screen {
    let classification = classify(phone);
    let text = format!(
        "{}\n\n{}\n<code>{}</code>",
        t("showphone-title"),
        escape(&format_phone_display(phone)),
        escape(phone)
    );

    let mut screen = Screen::new(text);
    if let Some(link) = whatsapp_link(classification) {
        screen = screen.button(Button::url(t("btn-whatsapp"), link));
    }
    screen.button(back_button())
}
