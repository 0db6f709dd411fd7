// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Background eviction of expired sessions

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::interval;

use super::store::SessionStore;

/// Spawn a task that periodically evicts expired sessions and pending logins.
///
/// The returned handle can be used to abort the task.
pub fn spawn_cleanup_task(
    store: Arc<SessionStore>,
    cleanup_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(cleanup_interval);

        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let evicted = store.evict_expired();
            if evicted > 0 {
                info!("Session cleanup evicted {} expired entries", evicted);
            }
            debug!(
                "Session store holds {} sessions and {} pending logins",
                store.session_count(),
                store.pending_count()
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::identity::AuthenticatedIdentity;

    #[tokio::test]
    async fn cleanup_task_evicts_expired_sessions() {
        let store = Arc::new(SessionStore::new(
            chrono::Duration::milliseconds(10),
            chrono::Duration::minutes(5),
        ));
        store.create(
            AuthenticatedIdentity {
                name: "bob".to_string(),
                token: None,
                authorities: vec![],
                claims: serde_json::Map::new(),
            },
            None,
            None,
        );
        assert_eq!(store.session_count(), 1);

        let handle = spawn_cleanup_task(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(store.session_count(), 0);
    }
}
