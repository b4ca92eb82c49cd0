// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic sweep over all tracked conversations.
//!
//! The sweep drops queue entries older than the message TTL and recomputes
//! each conversation's phase; state blob expiry itself is handled by the
//! store's own TTL. The sweep task is owned by the manager and stops with
//! its cancellation token, so tests and embedders control its lifecycle
//! explicitly.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use confab_core::ConfabError;
use confab_core::traits::StateStore;
use confab_core::types::ConversationId;

/// Counters from one full sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Conversations visited.
    pub conversations: usize,
    /// Queue entries dropped for exceeding the message TTL.
    pub expired_entries: usize,
    /// Conversations whose phase changed during the sweep.
    pub repaired: usize,
    /// Conversations that failed to sweep (logged and skipped).
    pub errors: usize,
}

/// Owns the background cleanup task.
pub struct CleanupManager {
    store: Arc<dyn StateStore>,
    interval: Duration,
    message_ttl: Duration,
    cancel: Mutex<Option<CancellationToken>>,
}

impl CleanupManager {
    pub fn new(store: Arc<dyn StateStore>, config: &confab_config::CoordinatorConfig) -> Self {
        Self {
            store,
            interval: config.cleanup_interval(),
            message_ttl: config.message_ttl(),
            cancel: Mutex::new(None),
        }
    }

    /// Spawn the periodic sweep task. A second call while the task is
    /// running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.cancel.lock().await;
        if guard.is_some() {
            warn!("cleanup task already running, ignoring start");
            return;
        }

        let token = CancellationToken::new();
        *guard = Some(token.clone());

        let manager = Arc::clone(self);
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the sweep runs
            // one full interval after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let stats = manager.sweep().await;
                        if stats.expired_entries > 0 || stats.repaired > 0 || stats.errors > 0 {
                            info!(
                                conversations = stats.conversations,
                                expired_entries = stats.expired_entries,
                                repaired = stats.repaired,
                                errors = stats.errors,
                                "cleanup sweep finished"
                            );
                        }
                    }
                }
            }
        });

        info!(interval_secs = self.interval.as_secs(), "cleanup task started");
    }

    /// Cancel the sweep task. A no-op when nothing is running.
    pub async fn stop(&self) {
        if let Some(token) = self.cancel.lock().await.take() {
            token.cancel();
        }
    }

    /// Sweep every tracked conversation once.
    ///
    /// A failure in one conversation is logged and counted; the sweep
    /// continues with the rest.
    pub async fn sweep(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let ids = match self.store.list_ids().await {
            Ok(ids) => ids,
            Err(error) => {
                warn!(%error, "cleanup sweep could not list conversations");
                stats.errors += 1;
                return stats;
            }
        };

        for id in ids {
            stats.conversations += 1;
            match self.cleanup_conversation(&id).await {
                Ok((expired, repaired)) => {
                    stats.expired_entries += expired;
                    if repaired {
                        stats.repaired += 1;
                    }
                }
                Err(error) => {
                    warn!(conversation_id = %id, %error, "cleanup failed for conversation");
                    stats.errors += 1;
                }
            }
        }

        stats
    }

    /// Purge expired queue entries for one conversation and recompute its
    /// phase. Returns the number of dropped entries and whether the phase
    /// changed. Persists only when something changed.
    async fn cleanup_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<(usize, bool), ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        let now = Utc::now();
        let ttl_secs = self.message_ttl.as_secs() as i64;
        let before = state.message_queue.len();
        state.message_queue.retain(|entry| {
            let expired = entry.age_secs(now) > ttl_secs;
            if expired {
                warn!(
                    conversation_id = %id,
                    message_id = entry.message_id.as_str(),
                    age_secs = entry.age_secs(now),
                    "dropping expired queue entry"
                );
            }
            !expired
        });
        let expired = before - state.message_queue.len();

        let old_phase = state.phase;
        state.recompute_phase();
        let repaired = state.phase != old_phase;

        if expired > 0 || repaired {
            self.store.set(id, state).await?;
        }

        Ok((expired, repaired))
    }
}
