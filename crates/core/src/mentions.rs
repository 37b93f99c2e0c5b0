//! `@username` mention extraction.

use once_cell::sync::Lazy;
use regex::Regex;

// Usernames are lowercase alphanumeric, up to 24 chars. A mention token must
// not be preceded by a word character (so "a@b" is an email, not a mention).
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?:^|[^\w@])@([a-z0-9]{1,24})\b").unwrap()
});

/// Extract the distinct `@username` tokens from a text body, in order of
/// first appearance.
#[must_use]
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut mentions = Vec::new();

    for capture in MENTION_RE.captures_iter(text) {
        if let Some(m) = capture.get(1) {
            let username = m.as_str().to_string();
            if seen.insert(username.clone()) {
                mentions.push(username);
            }
        }
    }

    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single() {
        assert_eq!(extract_mentions("hello @alice!"), vec!["alice"]);
    }

    #[test]
    fn test_extract_multiple() {
        assert_eq!(extract_mentions("@alice and @bob42"), vec!["alice", "bob42"]);
    }

    #[test]
    fn test_extract_dedupes() {
        assert_eq!(extract_mentions("@alice @alice @alice"), vec!["alice"]);
    }

    #[test]
    fn test_extract_none() {
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn test_extract_bare_at() {
        assert!(extract_mentions("just an @ sign").is_empty());
    }

    #[test]
    fn test_email_is_not_a_mention() {
        assert!(extract_mentions("mail me at alice@example.com").is_empty());
    }

    #[test]
    fn test_uppercase_not_matched() {
        // Usernames are stored lowercase; @Alice is not a valid handle token
        assert!(extract_mentions("@Alice").is_empty());
    }

    #[test]
    fn test_mention_at_start() {
        assert_eq!(extract_mentions("@bob hi"), vec!["bob"]);
    }
}
