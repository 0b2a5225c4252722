// 🤖 Bot Classifier - Naming heuristic for automated accounts
// A profile is a bot when any of its candidate usernames contains the token "bot"

use crate::db::Identity;
use regex::Regex;
use std::sync::OnceLock;

/// `bot` as a standalone token. Anything that is not a letter or a digit
/// separates tokens, so `john_bot` and `crawler-bot-7` match while
/// `robot` and `Abbot` do not.
pub const USERNAME_BOT_PATTERN: &str = r"(?i)(?:^|[^\p{L}\p{N}])bot(?:[^\p{L}\p{N}]|$)";

// ============================================================================
// BOT MATCHER
// ============================================================================

#[derive(Debug, Clone)]
pub struct BotMatcher {
    pattern: Regex,
}

impl BotMatcher {
    pub fn new() -> Self {
        static PATTERN: OnceLock<Regex> = OnceLock::new();

        let pattern = PATTERN
            .get_or_init(|| Regex::new(USERNAME_BOT_PATTERN).expect("valid regex"))
            .clone();

        BotMatcher { pattern }
    }

    /// True when the username probably belongs to a bot.
    /// Missing usernames never match.
    pub fn probably_a_bot(&self, username: Option<&str>) -> bool {
        match username {
            Some(name) => self.pattern.is_match(name),
            None => false,
        }
    }
}

impl Default for BotMatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict<'a> {
    pub is_bot: bool,

    /// Last candidate examined, used when reporting
    pub identity: &'a Identity,
}

/// Reduce a profile's candidates to one verdict.
///
/// Every candidate is examined; the verdict is the OR over all of them.
/// Returns `None` for an empty candidate set.
pub fn classify<'a>(matcher: &BotMatcher, candidates: &'a [Identity]) -> Option<Verdict<'a>> {
    let mut is_bot = false;
    let mut last = None;

    for identity in candidates {
        if matcher.probably_a_bot(identity.username.as_deref()) {
            is_bot = true;
        }
        last = Some(identity);
    }

    last.map(|identity| Verdict { is_bot, identity })
}
