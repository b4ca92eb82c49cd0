// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reorganizing raw chronological history into alternating user/character turns.
//!
//! Inference expects a strict user -> character alternation, but a human can
//! send several messages before the previous one is answered. The merge here
//! is lossless with respect to intent: rapid-fire user messages become one
//! combined turn rather than being dropped or reordered.

use tracing::{debug, warn};

use confab_core::types::{ChatMessage, Sender};

/// Placeholder content used when every message in a combined run was blank
/// (e.g. a burst of image-only messages).
pub const MULTIPLE_NON_TEXT_PLACEHOLDER: &str = "[Multiple non-text messages]";

/// Merge a run of consecutive user messages into a single turn.
///
/// - Zero messages: `None`; the caller must not append anything.
/// - One message: returned unchanged.
/// - Two or more: blank contents are dropped first. If everything was blank,
///   the first message is returned with placeholder content. If exactly one
///   had real content, that one is returned unchanged. Otherwise contents
///   are joined with a blank line, numbered (`"1. ..."`) only when more than
///   two fragments survive, and the combined count is recorded for
///   diagnostics.
pub fn combine_consecutive_user_messages(messages: &[ChatMessage]) -> Option<ChatMessage> {
    match messages {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            let fragments: Vec<&ChatMessage> = messages
                .iter()
                .filter(|m| !m.content.trim().is_empty())
                .collect();

            match fragments.as_slice() {
                [] => {
                    let mut combined = messages[0].clone();
                    combined.content = MULTIPLE_NON_TEXT_PLACEHOLDER.to_string();
                    Some(combined)
                }
                [only] => Some((*only).clone()),
                _ => {
                    let content = if fragments.len() > 2 {
                        fragments
                            .iter()
                            .enumerate()
                            .map(|(i, m)| format!("{}. {}", i + 1, m.content))
                            .collect::<Vec<_>>()
                            .join("\n\n")
                    } else {
                        fragments
                            .iter()
                            .map(|m| m.content.clone())
                            .collect::<Vec<_>>()
                            .join("\n\n")
                    };

                    let mut combined = fragments[0].clone();
                    combined.content = content;
                    combined.combined_count = Some(fragments.len());
                    Some(combined)
                }
            }
        }
    }
}

/// Fold a chronological message list into alternating user/character turns.
///
/// Messages flagged with an LLM error are dropped up front: they represent
/// turns that never received a successful reply and would waste context
/// budget. Unknown senders are skipped with a warning. A conversation that
/// (incorrectly) begins with a character message is passed through
/// unchanged but logged; the formatter never fabricates a leading user turn.
pub fn reorganize_to_alternating(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let errored = messages.iter().filter(|m| m.has_llm_error).count();
    if errored > 0 {
        debug!(count = errored, "dropping errored turns from history");
    }

    let mut result: Vec<ChatMessage> = Vec::new();
    let mut user_run: Vec<ChatMessage> = Vec::new();
    let mut seen_any = false;

    for message in messages.iter().filter(|m| !m.has_llm_error) {
        match message.sender {
            Sender::User => {
                user_run.push(message.clone());
            }
            Sender::Character => {
                if !seen_any && user_run.is_empty() {
                    debug!(
                        message_id = message.id.as_str(),
                        "history begins with a character message"
                    );
                }
                if let Some(combined) = combine_consecutive_user_messages(&user_run) {
                    result.push(combined);
                }
                user_run.clear();
                result.push(message.clone());
            }
            Sender::Unknown => {
                warn!(
                    message_id = message.id.as_str(),
                    "skipping message with unknown sender"
                );
                continue;
            }
        }
        seen_any = true;
    }

    if let Some(combined) = combine_consecutive_user_messages(&user_run) {
        result.push(combined);
    }

    result
}

/// Append the in-flight message to already-alternating history.
///
/// When the trailing entry is also from the user, the in-flight message is
/// merged into it so inference sees one combined user turn rather than two
/// consecutive ones. If the trailing entry *is* the in-flight message
/// (same sender and content), the history is left untouched.
pub fn handle_current_message_with_history(
    mut history: Vec<ChatMessage>,
    current: &ChatMessage,
) -> Vec<ChatMessage> {
    if let Some(last) = history.last() {
        if last.sender == Sender::User && current.sender == Sender::User {
            if last.content == current.content {
                // Already present; a duplicate append would double the turn.
                return history;
            }
            if let Some(merged) =
                combine_consecutive_user_messages(&[last.clone(), current.clone()])
            {
                let idx = history.len() - 1;
                history[idx] = merged;
                return history;
            }
        }
    }
    history.push(current.clone());
    history
}
