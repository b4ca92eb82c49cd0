// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural validation of a conversation's message pattern.
//!
//! For observability rather than hard enforcement: the report feeds logs
//! and dashboards, never a rejection path.

use confab_core::types::{ChatMessage, Sender};

/// A structural issue found in a message sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternIssue {
    /// A run of two or more consecutive messages from the same sender.
    ConsecutiveSameSender {
        sender: Sender,
        start_index: usize,
        run_length: usize,
    },
    /// A message whose content is empty or whitespace-only.
    NearEmptyMessage { index: usize, message_id: String },
}

/// Result of pattern validation: hard-ish issues plus soft suggestions.
#[derive(Debug, Clone, Default)]
pub struct PatternReport {
    pub issues: Vec<PatternIssue>,
    pub suggestions: Vec<String>,
}

impl PatternReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.suggestions.is_empty()
    }
}

/// Inspect a chronological message list for alternation breaks, near-empty
/// messages, and a skewed user:character ratio.
pub fn validate_conversation_pattern(messages: &[ChatMessage]) -> PatternReport {
    let mut report = PatternReport::default();

    let mut run_start = 0usize;
    let mut run_length = 0usize;
    let mut run_sender: Option<Sender> = None;

    for (index, message) in messages.iter().enumerate() {
        if message.content.trim().is_empty() {
            report.issues.push(PatternIssue::NearEmptyMessage {
                index,
                message_id: message.id.clone(),
            });
        }

        if run_sender == Some(message.sender) {
            run_length += 1;
        } else {
            flush_run(&mut report, run_sender, run_start, run_length);
            run_sender = Some(message.sender);
            run_start = index;
            run_length = 1;
        }
    }
    flush_run(&mut report, run_sender, run_start, run_length);

    let user_count = messages.iter().filter(|m| m.sender == Sender::User).count();
    let character_count = messages
        .iter()
        .filter(|m| m.sender == Sender::Character)
        .count();

    if character_count > 0 && user_count > character_count * 2 {
        report.suggestions.push(format!(
            "user messages outnumber character replies {user_count}:{character_count}; \
             the conversation may have unanswered turns piling up"
        ));
    }
    if user_count > 0 && character_count > user_count * 2 {
        report.suggestions.push(format!(
            "character replies outnumber user messages {character_count}:{user_count}; \
             check for duplicate or unsolicited responses"
        ));
    }

    report
}

fn flush_run(
    report: &mut PatternReport,
    sender: Option<Sender>,
    start_index: usize,
    run_length: usize,
) {
    if let Some(sender) = sender {
        if run_length >= 2 {
            report.issues.push(PatternIssue::ConsecutiveSameSender {
                sender,
                start_index,
                run_length,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, content: &str) -> ChatMessage {
        ChatMessage::user(id, content, Utc::now())
    }

    fn character(id: &str, content: &str) -> ChatMessage {
        ChatMessage::character(id, content, Utc::now())
    }

    #[test]
    fn clean_alternation_produces_empty_report() {
        let report = validate_conversation_pattern(&[
            user("m1", "hi"),
            character("m2", "hello"),
            user("m3", "how are you"),
            character("m4", "well"),
        ]);
        assert!(report.is_clean());
    }

    #[test]
    fn consecutive_same_sender_run_reported() {
        let report = validate_conversation_pattern(&[
            user("m1", "a"),
            user("m2", "b"),
            user("m3", "c"),
            character("m4", "reply"),
        ]);
        assert_eq!(
            report.issues,
            vec![PatternIssue::ConsecutiveSameSender {
                sender: Sender::User,
                start_index: 0,
                run_length: 3,
            }]
        );
    }

    #[test]
    fn trailing_run_reported() {
        let report = validate_conversation_pattern(&[
            user("m1", "a"),
            character("m2", "reply"),
            character("m3", "again"),
        ]);
        assert!(report.issues.iter().any(|i| matches!(
            i,
            PatternIssue::ConsecutiveSameSender {
                sender: Sender::Character,
                start_index: 1,
                run_length: 2,
            }
        )));
    }

    #[test]
    fn near_empty_message_reported() {
        let report =
            validate_conversation_pattern(&[user("m1", "  "), character("m2", "reply")]);
        assert_eq!(
            report.issues,
            vec![PatternIssue::NearEmptyMessage {
                index: 0,
                message_id: "m1".to_string(),
            }]
        );
    }

    #[test]
    fn skewed_user_ratio_yields_suggestion() {
        let report = validate_conversation_pattern(&[
            user("m1", "a"),
            user("m2", "b"),
            user("m3", "c"),
            user("m4", "d"),
            user("m5", "e"),
            character("m6", "reply"),
        ]);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("unanswered"));
    }

    #[test]
    fn empty_history_is_clean() {
        assert!(validate_conversation_pattern(&[]).is_clean());
    }
}
