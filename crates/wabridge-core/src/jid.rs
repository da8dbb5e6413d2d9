//! Utilities for classifying and formatting WhatsApp JIDs
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const USER_DOMAIN: &str = "s.whatsapp.net";
pub const GROUP_DOMAIN: &str = "g.us";

static USER_JID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+@s\.whatsapp\.net$").expect("valid user JID pattern"));
static GROUP_JID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+-[0-9]+@g\.us$").expect("valid group JID pattern"));
pub(crate) static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("valid phone pattern"));

/// Shape of a chat identity. Exactly one variant applies to any string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JidKind {
    Group,
    DirectContact,
    Invalid,
}

impl JidKind {
    pub fn classify(jid: &str) -> Self {
        if GROUP_JID.is_match(jid) {
            JidKind::Group
        } else if USER_JID.is_match(jid) {
            JidKind::DirectContact
        } else {
            JidKind::Invalid
        }
    }

    pub fn is_valid(self) -> bool {
        self != JidKind::Invalid
    }
}

/// Format a JID for display when the network gave the chat no name
/// - Phone number JIDs ("5511999999999@s.whatsapp.net") show the formatted number
/// - Everything else is shown as-is
pub fn format_jid_for_display(jid: &str) -> String {
    match JidKind::classify(jid) {
        JidKind::DirectContact => {
            let phone = jid.split('@').next().unwrap_or_default();
            format_phone_number(phone)
        }
        JidKind::Group | JidKind::Invalid => jid.to_string(),
    }
}

/// Format a phone number string for better readability
/// Example: "5511999999999" -> "+55 11 99999-9999"
pub fn format_phone_number(phone: &str) -> String {
    if phone.is_empty() {
        return phone.to_string();
    }

    // Brazilian numbers: +55 11 99999-9999 or +55 11 9999-9999
    if phone.starts_with("55") && phone.len() >= 12 {
        let country = &phone[0..2];
        let area = &phone[2..4];
        let rest = &phone[4..];

        if rest.len() == 9 {
            return format!("+{} {} {}-{}", country, area, &rest[0..5], &rest[5..]);
        } else if rest.len() == 8 {
            return format!("+{} {} {}-{}", country, area, &rest[0..4], &rest[4..]);
        }
    }

    if phone.len() > 10 {
        return format!("+{}", phone);
    }

    phone.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_group() {
        assert_eq!(
            JidKind::classify("123456789-123456789@g.us"),
            JidKind::Group
        );
    }

    #[test]
    fn test_classify_direct_contact() {
        assert_eq!(
            JidKind::classify("1234567890@s.whatsapp.net"),
            JidKind::DirectContact
        );
        assert_eq!(
            JidKind::classify("123456789@s.whatsapp.net"),
            JidKind::DirectContact
        );
    }

    #[test]
    fn test_classify_invalid() {
        for jid in [
            "",
            "invalid",
            "1234567890",
            "123@invalid.domain",
            "abc@s.whatsapp.net",
            "123456789@g.us",
            "1-2@s.whatsapp.net",
            "1234567890@s.whatsapp.net.evil",
        ] {
            assert_eq!(JidKind::classify(jid), JidKind::Invalid, "{jid}");
            assert!(!JidKind::classify(jid).is_valid());
        }
    }

    #[test]
    fn test_format_brazilian_mobile() {
        assert_eq!(format_phone_number("5511999999999"), "+55 11 99999-9999");
    }

    #[test]
    fn test_format_brazilian_landline() {
        assert_eq!(format_phone_number("551133334444"), "+55 11 3333-4444");
    }

    #[test]
    fn test_format_international() {
        assert_eq!(format_phone_number("447911123456"), "+447911123456");
        assert_eq!(format_phone_number("1234567890"), "1234567890");
    }

    #[test]
    fn test_format_jid_phone() {
        assert_eq!(
            format_jid_for_display("5511999999999@s.whatsapp.net"),
            "+55 11 99999-9999"
        );
    }

    #[test]
    fn test_format_jid_group_is_raw() {
        assert_eq!(format_jid_for_display("1-2@g.us"), "1-2@g.us");
    }
}
