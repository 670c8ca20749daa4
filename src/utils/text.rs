//! Text processing utilities.

use regex::Regex;
use std::sync::LazyLock;

/// Minimum non-whitespace characters for meaningful content.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Check if content has meaningful text (not just whitespace/punctuation).
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().filter(|c| !c.is_whitespace()).count() >= MIN_CONTENT_LENGTH
}

static RE_THINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Strip `<think>...</think>` blocks that reasoning models emit before their answer.
pub fn strip_think_tags(text: &str) -> String {
    RE_THINK.replace_all(text, "").trim().to_string()
}

/// Strip a surrounding Markdown code fence, if present.
///
/// Models often wrap JSON answers in ```json blocks even when told not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate text to at most `max_chars` characters, appending an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_meaningful_content() {
        assert!(has_meaningful_content(
            "This is a real paragraph with enough characters."
        ));
        assert!(!has_meaningful_content("   \n\t  "));
        assert!(!has_meaningful_content("ok"));
    }

    #[test]
    fn test_strip_think_tags() {
        let text = "<think>reasoning here\nmore reasoning</think>The answer is 42.";
        assert_eq!(strip_think_tags(text), "The answer is 42.");
        assert_eq!(strip_think_tags("no tags"), "no tags");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
    }
}
