//! # Phone Number Module
//!
//! Classification, validation and display formatting for the phone numbers
//! stored against each contact.
//!
//! Two rule sets live here on purpose and must not be merged:
//!
//! - [`is_valid_for_storage`] is strict. It gates what an admin may submit.
//! - [`format_button_label`] and [`format_phone_display`] are lenient. They render
//!   whatever is already stored, including rows written before the strict rules
//!   existed, and never fail on input they did not validate.

use lazy_static::lazy_static;
use regex::Regex;

/// Country calling code for Uzbekistan, without the leading `+`
pub const COUNTRY_CODE: &str = "998";

/// Base URL for the WhatsApp click-to-chat link
pub const DEEPLINK_BASE: &str = "https://wa.me/";

/// Marker replacing the hidden middle digits of a long number
pub const MASK: &str = "***";

/// Cleaned numbers longer than this are truncated in labels
const MAX_LABEL_DIGITS: usize = 15;
const TRUNCATED_DIGITS: usize = 12;

lazy_static! {
    static ref CONTACT_INPUT: Regex =
        Regex::new(r"^\s*(?P<service>[^|]*?)\s*\|\s*(?P<phone>.*?)\s*$")
            .expect("Contact input pattern should be valid");
}

/// Which of the four national long formats a number matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongFormat {
    /// `+998` followed by nine digits
    PlusCountryCode,
    /// `998` followed by nine digits
    CountryCode,
    /// Bare nine digit subscriber number
    Subscriber,
    /// Twelve digits without a `+`
    National,
}

/// Kind of phone number after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneKind {
    /// 2-5 digit emergency or utility code dialed directly (e.g. "103")
    Short,
    /// Full subscriber number in one of the recognized national formats
    UzbekLong(LongFormat),
    Invalid,
}

/// Derived view of a phone string, never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: PhoneKind,
    /// Digits with at most one leading `+`
    pub cleaned: String,
    /// Text shown in parentheses on a contact button, empty when there is nothing to show
    pub masked: String,
    /// Messaging-app link, present only for `UzbekLong`
    pub deeplink: Option<String>,
}

impl Classification {
    pub fn is_short(&self) -> bool {
        self.kind == PhoneKind::Short
    }

    pub fn is_uzbek_long(&self) -> bool {
        matches!(self.kind, PhoneKind::UzbekLong(_))
    }
}

/// Strip every character except digits and a single leading `+`
pub fn clean(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '+' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }
    cleaned
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn kind_of(cleaned: &str) -> PhoneKind {
    let digits = all_digits(cleaned);
    let len = cleaned.len();

    if digits && (2..=5).contains(&len) {
        return PhoneKind::Short;
    }

    if cleaned.starts_with("+998") && len == 13 && all_digits(&cleaned[1..]) {
        PhoneKind::UzbekLong(LongFormat::PlusCountryCode)
    } else if digits && cleaned.starts_with(COUNTRY_CODE) && len == 12 {
        PhoneKind::UzbekLong(LongFormat::CountryCode)
    } else if digits && len == 9 {
        PhoneKind::UzbekLong(LongFormat::Subscriber)
    } else if digits && len == 12 {
        PhoneKind::UzbekLong(LongFormat::National)
    } else {
        PhoneKind::Invalid
    }
}

/// Keep the operator code and the last four digits, hide the middle
fn mask_range(cleaned: &str, start: usize, end: usize) -> String {
    let last_four = &cleaned[cleaned.len() - 4..];
    format!("{}{}{}", &cleaned[start..end], MASK, last_four)
}

fn masked_display(cleaned: &str, kind: PhoneKind) -> String {
    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return String::new();
    }

    match kind {
        PhoneKind::Short => cleaned.to_string(),
        PhoneKind::UzbekLong(LongFormat::PlusCountryCode) => mask_range(cleaned, 4, 7),
        PhoneKind::UzbekLong(LongFormat::CountryCode | LongFormat::National) => {
            mask_range(cleaned, 3, 6)
        }
        PhoneKind::UzbekLong(LongFormat::Subscriber) => mask_range(cleaned, 0, 3),
        PhoneKind::Invalid => {
            // Legacy rows with a country prefix but the wrong length still get masked
            let len = cleaned.len();
            if cleaned.starts_with("+998") && len >= 7 {
                mask_range(cleaned, 4, 7)
            } else if cleaned.starts_with(COUNTRY_CODE) && len >= 6 {
                mask_range(cleaned, 3, 6)
            } else if len <= MAX_LABEL_DIGITS {
                cleaned.to_string()
            } else {
                format!("{}...", &cleaned[..TRUNCATED_DIGITS])
            }
        }
    }
}

/// Classify a raw phone string. Never fails; unusable input is `Invalid`.
pub fn classify(raw: &str) -> Classification {
    let cleaned = clean(raw);
    let kind = if cleaned.is_empty() {
        PhoneKind::Invalid
    } else {
        kind_of(&cleaned)
    };
    let masked = masked_display(&cleaned, kind);
    let deeplink = match kind {
        PhoneKind::UzbekLong(_) => build_messaging_deeplink(&cleaned),
        _ => None,
    };

    Classification {
        kind,
        cleaned,
        masked,
        deeplink,
    }
}

/// Strict gate applied before accepting an admin-submitted number
pub fn is_valid_for_storage(raw: &str) -> bool {
    !matches!(classify(raw).kind, PhoneKind::Invalid)
}

/// Button label for a contact, e.g. `"Usta (901***4567)"` or `"Tez yordam (103)"`
pub fn format_button_label(service: &str, phone: &str) -> String {
    let classification = classify(phone);
    if classification.masked.is_empty() {
        service.to_string()
    } else {
        format!("{} ({})", service, classification.masked)
    }
}

/// WhatsApp link for a number, with the country code prepended to bare subscriber numbers.
///
/// Returns `None` when the input has no digits at all.
pub fn build_messaging_deeplink(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let normalized = if digits.len() == 9 {
        format!("{COUNTRY_CODE}{digits}")
    } else {
        digits
    };

    Some(format!("{DEEPLINK_BASE}{normalized}"))
}

/// Phone as shown on the detail screen, prefixed with an icon for its kind
pub fn format_phone_display(phone: &str) -> String {
    let cleaned = clean(phone);
    match kind_of_display(&cleaned) {
        Some(PhoneKind::Short) => format!("📞 {phone}"),
        Some(PhoneKind::UzbekLong(LongFormat::PlusCountryCode)) => format!("🇺🇿 {phone}"),
        Some(PhoneKind::UzbekLong(LongFormat::CountryCode | LongFormat::National)) => {
            format!("🇺🇿 +{cleaned}")
        }
        Some(PhoneKind::UzbekLong(LongFormat::Subscriber)) => {
            format!("🇺🇿 +{COUNTRY_CODE}{cleaned}")
        }
        _ => phone.to_string(),
    }
}

fn kind_of_display(cleaned: &str) -> Option<PhoneKind> {
    if cleaned.is_empty() {
        None
    } else {
        Some(kind_of(cleaned))
    }
}

/// Split admin input of the form `"Service | Phone"`.
///
/// Returns `None` when there is no `|` separator. Either side may come back empty;
/// callers decide how to report that.
pub fn parse_contact_input(input: &str) -> Option<(String, String)> {
    let caps = CONTACT_INPUT.captures(input)?;
    let service = caps.name("service").map(|m| m.as_str()).unwrap_or_default();
    let phone = caps.name("phone").map(|m| m.as_str()).unwrap_or_default();
    Some((service.to_string(), phone.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_keeps_single_leading_plus() {
        assert_eq!(clean("+998 (90) 123-45-67"), "+998901234567");
        assert_eq!(clean("9+98"), "998");
        assert_eq!(clean("++103"), "+103");
        assert_eq!(clean("abc"), "");
    }

    #[test]
    fn test_short_codes() {
        for raw in ["10", "103", "1050", "11111"] {
            assert_eq!(classify(raw).kind, PhoneKind::Short, "{raw}");
        }
        assert_eq!(classify("1").kind, PhoneKind::Invalid);
    }

    #[test]
    fn test_long_formats() {
        assert_eq!(
            classify("+998901234567").kind,
            PhoneKind::UzbekLong(LongFormat::PlusCountryCode)
        );
        assert_eq!(
            classify("998901234567").kind,
            PhoneKind::UzbekLong(LongFormat::CountryCode)
        );
        assert_eq!(
            classify("901234567").kind,
            PhoneKind::UzbekLong(LongFormat::Subscriber)
        );
        assert_eq!(
            classify("123456789012").kind,
            PhoneKind::UzbekLong(LongFormat::National)
        );
    }

    #[test]
    fn test_plus_without_digits_is_invalid() {
        let c = classify("+");
        assert_eq!(c.kind, PhoneKind::Invalid);
        assert!(c.masked.is_empty());
        assert!(c.deeplink.is_none());
    }

    #[test]
    fn test_mask_ranges() {
        assert_eq!(classify("+998901234567").masked, "901***4567");
        assert_eq!(classify("998901234567").masked, "901***4567");
        assert_eq!(classify("901234567").masked, "901***4567");
        assert_eq!(classify("123456789012").masked, "456***9012");
    }

    #[test]
    fn test_legacy_prefixed_numbers_still_masked() {
        // wrong total length, rejected for storage but displayed
        assert!(!is_valid_for_storage("99890123456"));
        assert_eq!(classify("99890123456").masked, "901***3456");
        assert_eq!(format_button_label("Old", "+99890123"), "Old (901***0123)");
        // shortest prefixed forms that still carry an operator code
        assert_eq!(classify("+998901").masked, "901***8901");
        assert_eq!(classify("998901").masked, "901***8901");
        assert_eq!(classify("+99890").masked, "+99890");
    }

    #[test]
    fn test_parse_contact_input() {
        assert_eq!(
            parse_contact_input("Tez yordam | 103"),
            Some(("Tez yordam".to_string(), "103".to_string()))
        );
        assert_eq!(
            parse_contact_input("  Usta|901234567  "),
            Some(("Usta".to_string(), "901234567".to_string()))
        );
        assert_eq!(
            parse_contact_input(" | 103"),
            Some((String::new(), "103".to_string()))
        );
        assert_eq!(parse_contact_input("no separator"), None);
    }

    #[test]
    fn test_format_phone_display() {
        assert_eq!(format_phone_display("103"), "📞 103");
        assert_eq!(format_phone_display("+998901234567"), "🇺🇿 +998901234567");
        assert_eq!(format_phone_display("998901234567"), "🇺🇿 +998901234567");
        assert_eq!(format_phone_display("901234567"), "🇺🇿 +998901234567");
        assert_eq!(format_phone_display("12-34"), "📞 12-34");
        assert_eq!(format_phone_display("hello"), "hello");
    }
}
