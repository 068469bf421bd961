//! Helpers for Telegram MarkdownV2 text.
//!
//! Every character in [`SPECIAL_CHARS`] must be escaped outside of entities,
//! otherwise Telegram rejects the whole message.

/// Characters with special meaning in MarkdownV2.
pub const SPECIAL_CHARS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escapes markdown special characters for MarkdownV2 parsing mode
///
/// # Example
/// ```
/// use nutribot::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("Goal: 2450.0 ml (100%)!"), "Goal: 2450\\.0 ml \\(100%\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escaped text wrapped in bold markers.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

/// Inline code; only `` ` `` and `\` need escaping inside.
pub fn code(text: &str) -> String {
    format!("`{}`", text.replace('\\', "\\\\").replace('`', "\\`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_amounts_and_percentages() {
        assert_eq!(escape_markdown("2450 ml"), "2450 ml");
        assert_eq!(escape_markdown("68.5 kg"), "68\\.5 kg");
        assert_eq!(escape_markdown("(42.0%)"), "\\(42\\.0%\\)");
    }

    #[test]
    fn test_escape_every_special_char() {
        for c in SPECIAL_CHARS {
            let escaped = escape_markdown(&c.to_string());
            assert_eq!(escaped, format!("\\{c}"));
        }
    }

    #[test]
    fn test_escape_leaves_emoji_and_plain_text() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("💧 Hydration"), "💧 Hydration");
        assert_eq!(escape_markdown("Plan: weight_loss"), "Plan: weight\\_loss");
    }

    #[test]
    fn test_bold_and_code() {
        assert_eq!(bold("Goal reached!"), "*Goal reached\\!*");
        assert_eq!(code("08:00-22:00"), "`08:00-22:00`");
        assert_eq!(code("a`b"), "`a\\`b`");
    }
}
