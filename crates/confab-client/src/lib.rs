// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side reconciliation for Confab.
//!
//! [`MessageTimeline`] is the contract any client must implement to keep
//! an optimistic UI consistent with the coordinator: render the send
//! immediately, apply server events idempotently, honor the retry budget,
//! and link AI responses back to the user messages they answer.

pub mod timeline;

pub use timeline::MessageTimeline;
