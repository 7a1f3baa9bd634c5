//! Response sanitization
//!
//! Lines coming off the wire may carry carriage returns, NUL padding or
//! other control characters. Everything the engine compares against the
//! step table goes through [`sanitize`] first.

use std::fmt;

use unicode_general_category::{GeneralCategory, get_general_category};

use crate::constants::HEARTBEAT;

/// Strip non-printable characters and surrounding whitespace.
///
/// Printable means: the ASCII space, or any character outside the
/// `Other` (Cc, Cf, Cs, Co, Cn) and `Separator` (Zs, Zl, Zp) categories.
/// The result is idempotent.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| is_printable(c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }

    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// A sanitized line received from the device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Response(String);

impl Response {
    /// Sanitize a raw line into a response
    pub fn parse(raw: &str) -> Self {
        Self(sanitize(raw))
    }

    /// Empty lines and `NO` mean "not ready yet", not a real answer
    pub fn is_heartbeat(&self) -> bool {
        self.0.is_empty() || self.0 == HEARTBEAT
    }

    /// Get the sanitized text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the sanitized text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_strips_line_endings() {
        assert_eq!(sanitize("BOK\r\n"), "BOK");
        assert_eq!(sanitize("  DECAP_OK  \n"), "DECAP_OK");
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize("\0\0CO\x07K\x1b"), "COK");
        assert_eq!(sanitize("\u{FEFF}RECAP_OK"), "RECAP_OK");
    }

    #[test]
    fn test_sanitize_strips_invisible_chars() {
        // private use, Arabic number sign, letter mark, language tag, noncharacter
        assert_eq!(sanitize("\u{E000}BOK"), "BOK");
        assert_eq!(sanitize("BOK\u{0600}"), "BOK");
        assert_eq!(sanitize("\u{061C}BOK"), "BOK");
        assert_eq!(sanitize("BOK\u{E0001}"), "BOK");
        assert_eq!(sanitize("BOK\u{10FFFF}"), "BOK");
        assert_eq!(sanitize("DECAP\u{00A0}OK\u{2028}"), "DECAPOK");
    }

    #[test]
    fn test_sanitize_keeps_visible_unicode() {
        assert_eq!(sanitize("\u{00C9}TAT \u{2713}"), "\u{00C9}TAT \u{2713}");
    }

    #[test]
    fn test_sanitize_keeps_inner_spaces() {
        assert_eq!(sanitize("ERR 42\t"), "ERR 42");
    }

    #[test]
    fn test_heartbeat_detection() {
        assert!(Response::parse("").is_heartbeat());
        assert!(Response::parse("\r\n").is_heartbeat());
        assert!(Response::parse("NO\r\n").is_heartbeat());
        assert!(!Response::parse("BNO").is_heartbeat());
        assert!(!Response::parse("NOPE").is_heartbeat());
    }

    proptest! {
        #[test]
        fn test_sanitize_idempotent(raw in any::<String>()) {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn test_sanitize_output_printable(raw in any::<String>()) {
            let clean = sanitize(&raw);
            prop_assert!(
                clean
                    .chars()
                    .all(|c| c == ' ' || !(c.is_control() || c.is_whitespace()))
            );
            prop_assert!(!clean.chars().any(|c| matches!(
                c,
                '\u{E000}'..='\u{F8FF}' | '\u{FEFF}' | '\u{200B}'..='\u{200F}'
            )), "sanitized output contains a private-use or zero-width char");
            prop_assert_eq!(clean.trim(), clean.as_str());
        }

        #[test]
        fn test_sanitize_keeps_ascii_graphic(raw in "[!-~]{1,16}") {
            prop_assert_eq!(sanitize(&raw), raw);
        }
    }
}
