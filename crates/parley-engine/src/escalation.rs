// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation policies: when does an inbound message hand the conversation
//! to a human?
//!
//! The policy is a capability injected into the pipeline, so new triggers
//! (commands, sentiment, external claim signals) slot in without touching
//! the transition logic.

use parley_core::{Message, NormalizedEvent, ParleyError};
use regex::RegexBuilder;

/// Decides whether an inbound event should escalate its conversation from
/// `active` to `human`.
pub trait EscalationPolicy: Send + Sync {
    fn should_escalate(&self, event: &NormalizedEvent, history: &[Message]) -> bool;
}

/// Escalates when the inbound text contains any configured keyword as a
/// whole word, case-insensitively.
pub struct KeywordEscalation {
    pattern: regex::Regex,
}

impl KeywordEscalation {
    pub fn new(keywords: &[String]) -> Result<Self, ParleyError> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(anchored)
            .collect();
        if alternatives.is_empty() {
            return Err(ParleyError::Config(
                "escalation keyword list is empty".to_string(),
            ));
        }
        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| ParleyError::Config(format!("invalid escalation keyword pattern: {e}")))?;
        Ok(Self { pattern })
    }
}

/// Escape a keyword and anchor it with `\b` only on the edges that hold a
/// word character. `\b` needs a word character on its inside, so anchoring a
/// punctuation edge would make the keyword unmatchable.
fn anchored(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let prefix = if keyword.chars().next().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    let suffix = if keyword.chars().last().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    format!("{prefix}{}{suffix}", regex::escape(keyword))
}

impl EscalationPolicy for KeywordEscalation {
    fn should_escalate(&self, event: &NormalizedEvent, _history: &[Message]) -> bool {
        self.pattern.is_match(&event.body)
    }
}

/// Never escalates. Used when handoff is driven purely by operator claims.
pub struct NeverEscalate;

impl EscalationPolicy for NeverEscalate {
    fn should_escalate(&self, _event: &NormalizedEvent, _history: &[Message]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(body: &str) -> NormalizedEvent {
        NormalizedEvent {
            event_id: "evt-1".to_string(),
            sender_external_id: "15551234567".to_string(),
            sender_display_name: None,
            message_external_id: "wamid.1".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            message_type: "text".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive_whole_word() {
        let policy =
            KeywordEscalation::new(&["human".to_string(), "agent".to_string()]).unwrap();
        assert!(policy.should_escalate(&event("I want a HUMAN please"), &[]));
        assert!(policy.should_escalate(&event("connect me to an agent"), &[]));
        // Substrings do not count.
        assert!(!policy.should_escalate(&event("the humanities department"), &[]));
        assert!(!policy.should_escalate(&event("urgently"), &[]));
    }

    #[test]
    fn keywords_with_regex_metacharacters_are_escaped() {
        let policy = KeywordEscalation::new(&["help (now)".to_string()]).unwrap();
        assert!(policy.should_escalate(&event("please help (now)"), &[]));
        assert!(!policy.should_escalate(&event("please help now"), &[]));
    }

    #[test]
    fn punctuation_edged_keywords_still_match() {
        // A word boundary cannot sit next to punctuation, so anchoring is
        // applied per edge.
        let policy = KeywordEscalation::new(&["#sos".to_string(), "help!".to_string()]).unwrap();
        assert!(policy.should_escalate(&event("sending #sos from the app"), &[]));
        assert!(policy.should_escalate(&event("HELP! something broke"), &[]));
        // The word-character edges still reject substring matches.
        assert!(!policy.should_escalate(&event("#sosig"), &[]));
    }

    #[test]
    fn empty_keyword_list_is_a_config_error() {
        let result = KeywordEscalation::new(&["  ".to_string()]);
        assert!(matches!(result, Err(ParleyError::Config(_))));
    }

    #[test]
    fn never_escalate_never_escalates() {
        assert!(!NeverEscalate.should_escalate(&event("human human human"), &[]));
    }
}
