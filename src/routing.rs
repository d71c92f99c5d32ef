//! Top-level routing — decides whether a user lands on sign-in, onboarding,
//! or the main application, and carries the per-user completion signal.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::store::{PersistenceGateway, UserIdentity};

/// Where a user should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRoute {
    SignIn,
    Onboarding,
    Main,
}

/// Per-user "onboarding finished" notification.
///
/// Each user gets a watch channel that starts `false` and is set to `true`
/// once. Late subscribers still observe the final value while the channel
/// is held. Channels are dropped once completion is durable, and idle
/// unfired channels are pruned when new ones are opened.
#[derive(Clone, Default)]
pub struct CompletionSignal {
    channels: Arc<RwLock<HashMap<String, watch::Sender<bool>>>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, user_id: &str) -> watch::Receiver<bool> {
        if let Some(tx) = self.channels.read().await.get(user_id) {
            return tx.subscribe();
        }
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| *tx.borrow() || tx.receiver_count() > 0);
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Mark the user's onboarding as finished. Returns `false` if it was
    /// already marked, in which case subscribers are not woken again.
    pub async fn emit(&self, user_id: &str) -> bool {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(false).0);
        let fired = tx.send_if_modified(|done| !std::mem::replace(done, true));
        debug!(user_id, fired, "Onboarding completion signal");
        fired
    }

    /// Drop the user's channel. Receivers keep the final value; later
    /// lookups fall through to the durable record.
    pub async fn release(&self, user_id: &str) {
        if self.channels.write().await.remove(user_id).is_some() {
            debug!(user_id, "Completion signal released");
        }
    }

    pub async fn is_completed(&self, user_id: &str) -> bool {
        self.channels
            .read()
            .await
            .get(user_id)
            .is_some_and(|tx| *tx.borrow())
    }
}

/// Resolves routes from the durable record, the local cache and the
/// in-process completion signal.
#[derive(Clone)]
pub struct AppRouter {
    gateway: PersistenceGateway,
    signal: CompletionSignal,
}

impl AppRouter {
    pub fn new(gateway: PersistenceGateway, signal: CompletionSignal) -> Self {
        Self { gateway, signal }
    }

    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    /// Route for the given (possibly absent) identity.
    ///
    /// A fired completion signal wins even when the completion write
    /// failed, so the user is never held on the generating screen.
    /// Resolving a route never creates or changes the durable record.
    pub async fn route(&self, identity: Option<&UserIdentity>) -> AppRoute {
        match identity {
            Some(identity) => self.route_user(&identity.id).await,
            None => AppRoute::SignIn,
        }
    }

    /// Route for a signed-in user id.
    pub async fn route_user(&self, user_id: &str) -> AppRoute {
        if self.signal.is_completed(user_id).await
            || self.gateway.resolve_onboarding(user_id).await
        {
            AppRoute::Main
        } else {
            AppRoute::Onboarding
        }
    }

    /// Wait until the user's onboarding is finished.
    pub async fn wait_for_completion(&self, user_id: &str) {
        let mut rx = self.signal.subscribe(user_id).await;
        // Covers a signal that fired and was released before we subscribed.
        if self.gateway.resolve_onboarding(user_id).await {
            return;
        }
        let _ = rx.wait_for(|done| *done).await;
    }
}
