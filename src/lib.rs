//! # Mahalla Contacts Telegram Bot
//!
//! A Telegram bot that keeps a neighbourhood group's directory of service
//! phone numbers and lets members browse it through inline menus.

pub mod bot;
pub mod config;
pub mod db;
pub mod errors;
pub mod localization;
pub mod menu_history;
pub mod phone;
pub mod screen;
