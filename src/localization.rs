//! # Localization Module
//!
//! User-facing strings live in Fluent resources under `locales/`. They are
//! compiled into the binary so the bot does not depend on its working directory.

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Language used when a requested one has no bundle
pub const DEFAULT_LANGUAGE: &str = "uz";

const RESOURCES: &[(&str, &str)] = &[(DEFAULT_LANGUAGE, include_str!("../locales/uz/main.ftl"))];

lazy_static! {
    static ref LOCALIZATION: LocalizationManager =
        LocalizationManager::new().expect("Bundled Fluent resources should parse");
}

/// Localization manager for the contact bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager with every bundled language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in RESOURCES {
            let locale: LanguageIdentifier = language.parse()?;
            bundles.insert(language.to_string(), Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource for {locale}: {errors:?}"))?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram HTML does not need bidi isolation marks around arguments
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages for {locale}: {errors:?}"))?;

        Ok(bundle)
    }

    /// Whether the default language has a message for `key`
    pub fn has_message(&self, key: &str) -> bool {
        self.bundles
            .get(DEFAULT_LANGUAGE)
            .is_some_and(|bundle| bundle.has_message(key))
    }

    /// Get a message in a language, falling back to the default language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let Some(bundle) = self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            warn!(key, language, "Missing translation");
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = Vec::new();
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, ?errors, "Fluent formatting errors");
        }

        value.into_owned()
    }

    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
    }
}

/// Get the global localization manager
pub fn localization() -> &'static LocalizationManager {
    &LOCALIZATION
}

/// Localized message without arguments
pub fn t(key: &str) -> String {
    localization().get_message(key, None)
}

/// Localized message with simple string arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    localization().get_message(key, Some(&args_map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_resources_parse() {
        let manager = LocalizationManager::new().unwrap();
        assert!(manager.has_message("main-title"));
        assert!(manager.has_message("btn-back"));
    }

    #[test]
    fn test_arguments_are_substituted_without_isolation_marks() {
        let text = t_args("contacts-total", &[("count", "7")]);
        assert_eq!(text, "<i>Jami 7 ta kontakt mavjud</i>");
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(t("no-such-key"), "Missing translation: no-such-key");
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let manager = LocalizationManager::new().unwrap();
        assert_eq!(
            manager.get_message_in_language("btn-back", "fr", None),
            "⬅️ Orqaga"
        );
    }
}
