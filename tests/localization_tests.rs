//! # Localization Tests
//!
//! Checks that every message the bot renders exists in the bundled resources
//! and that arguments are substituted as plain text.

use mahalla_contacts::errors::{DenialReason, ValidationError};
use mahalla_contacts::localization::{t, t_args, LocalizationManager};
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_error_keys_exist() {
        let manager = setup_localization();

        let validation = [
            ValidationError::MissingSeparator,
            ValidationError::EmptyService,
            ValidationError::EmptyPhone,
            ValidationError::ServiceTooLong,
            ValidationError::InvalidPhone,
        ];
        for err in validation {
            assert!(manager.has_message(err.message_key()), "{}", err.message_key());
        }

        let denials = [
            DenialReason::NotAdmin,
            DenialReason::GroupOnly,
            DenialReason::ChatNotAllowed,
        ];
        for reason in denials {
            assert!(manager.has_message(reason.message_key()), "{}", reason.message_key());
        }
    }

    #[test]
    fn test_button_labels_exist() {
        let manager = setup_localization();

        for key in [
            "btn-contacts",
            "btn-top",
            "btn-my-info",
            "btn-about",
            "btn-admin",
            "btn-back",
            "btn-whatsapp",
            "btn-show-phone",
            "btn-add-contact",
            "btn-delete-contact",
            "btn-developer",
        ] {
            assert!(manager.has_message(key), "{key}");
        }
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("service", "Tez yordam");
        let message = manager.get_message("add-done-service", Some(&args));
        assert!(message.contains("Tez yordam"));
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "uz", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_global_helpers() {
        assert_eq!(t("delete-done-toast"), "✅ O'chirildi");
        let text = t_args("unknown-command", &[("command", "/foo")]);
        assert!(text.contains("/foo"));
    }

    #[test]
    fn test_missing_argument_does_not_panic() {
        let text = t("add-done-service");
        assert!(!text.is_empty());
    }
}
