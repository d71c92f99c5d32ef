//! Plan generation orchestrator — runs the generator once, persists the
//! outcome (plan or fallback), and signals completion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::routing::CompletionSignal;
use crate::store::PersistenceGateway;

use super::generator::PlanGenerator;
use super::model::{FitnessPlan, UserProfile};
use super::progress::{ProgressSnapshot, ProgressTicker};

/// Result of [`PlanOrchestrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed {
        /// The generated plan; `None` on fallback or when the caller
        /// cancelled while the request was in flight.
        plan: Option<FitnessPlan>,
        /// Whether the completion record was written.
        persisted: bool,
        cancelled: bool,
    },
    /// A generation for this user is already in flight.
    AlreadyRunning,
}

pub struct PlanOrchestrator {
    generator: Arc<dyn PlanGenerator>,
    gateway: PersistenceGateway,
    signal: CompletionSignal,
    config: OrchestratorConfig,
    in_flight: Mutex<HashSet<String>>,
    progress: RwLock<HashMap<String, watch::Receiver<usize>>>,
}

impl PlanOrchestrator {
    pub fn new(
        generator: Arc<dyn PlanGenerator>,
        gateway: PersistenceGateway,
        signal: CompletionSignal,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            generator,
            gateway,
            signal,
            config,
            in_flight: Mutex::new(HashSet::new()),
            progress: RwLock::new(HashMap::new()),
        }
    }

    /// Generate, persist and signal for one user.
    ///
    /// The generator is called exactly once. Any generation failure falls
    /// back to completing onboarding without a plan, and the completion
    /// signal fires on every path so the user is never left waiting.
    /// Cancelling `cancel` does not abort the request; it only discards the
    /// plan from the returned outcome. The record is still written.
    pub async fn run(
        &self,
        user_id: &str,
        profile: UserProfile,
        cancel: CancellationToken,
    ) -> GenerationOutcome {
        if !self.in_flight.lock().await.insert(user_id.to_string()) {
            warn!(user_id, "Plan generation already running, ignoring");
            return GenerationOutcome::AlreadyRunning;
        }

        let ticker = ProgressTicker::start(self.config.progress_tick);
        self.progress
            .write()
            .await
            .insert(user_id.to_string(), ticker.subscribe());

        info!(user_id, "Plan generation started");
        let plan = match self.generator.generate(&profile).await {
            Ok(plan) => Some(plan),
            Err(e) => {
                warn!(user_id, error = %e, "Plan generation failed, completing without a plan");
                None
            }
        };

        let persisted = match self
            .gateway
            .complete_onboarding(user_id, &profile, plan.as_ref())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(user_id, error = %e, "Failed to persist onboarding completion");
                false
            }
        };

        ticker.finish();
        self.progress.write().await.remove(user_id);
        self.signal.emit(user_id).await;
        if persisted {
            // The durable record answers from here on.
            self.signal.release(user_id).await;
        }
        self.in_flight.lock().await.remove(user_id);

        let cancelled = cancel.is_cancelled();
        if cancelled {
            info!(user_id, "Generation result discarded after cancellation");
        }
        info!(user_id, has_plan = plan.is_some(), persisted, "Plan generation finished");

        GenerationOutcome::Completed {
            plan: if cancelled { None } else { plan },
            persisted,
            cancelled,
        }
    }

    /// Whether a run is currently in flight for the user.
    pub async fn is_running(&self, user_id: &str) -> bool {
        self.in_flight.lock().await.contains(user_id)
    }

    /// Progress of the user's run while it is in flight.
    pub async fn progress(&self, user_id: &str) -> Option<ProgressSnapshot> {
        self.progress
            .read()
            .await
            .get(user_id)
            .map(|rx| ProgressSnapshot::from_completed(*rx.borrow()))
    }
}
