// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Confab workspace.
//!
//! `MockInference` scripts inference replies and failures; `RecordingSink`
//! captures coordinator events for assertions. Both implement the real
//! adapter traits so tests exercise the same code paths as production.

pub mod mock_provider;
pub mod recording_sink;

pub use mock_provider::MockInference;
pub use recording_sink::RecordingSink;
