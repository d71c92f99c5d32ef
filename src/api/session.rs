//! Per-user wizard sessions held by the API.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ValidationError;
use crate::onboarding::model::{Gender, Goal, UserProfile, WorkoutFrequency};
use crate::onboarding::state::{OnboardingStep, Wizard};

/// One answer submitted for a wizard step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StepAnswer {
    Gender {
        gender: Gender,
    },
    Goal {
        goal: Goal,
    },
    WorkoutFrequency {
        workout_frequency: WorkoutFrequency,
    },
    BirthDate {
        day: String,
        month: String,
        year: String,
    },
    BodyMetrics {
        height: String,
        weight: String,
    },
}

impl StepAnswer {
    /// Apply the answer through the wizard's setters.
    pub fn apply(self, wizard: &mut Wizard) -> Result<(), ValidationError> {
        match self {
            Self::Gender { gender } => wizard.select_gender(gender),
            Self::Goal { goal } => wizard.select_goal(goal),
            Self::WorkoutFrequency { workout_frequency } => {
                wizard.select_workout_frequency(workout_frequency)
            }
            Self::BirthDate { day, month, year } => {
                wizard.enter_birth_date(&day, &month, &year).map(|_| ())
            }
            Self::BodyMetrics { height, weight } => wizard.enter_body_metrics(&height, &weight),
        }
    }
}

/// What a client sees of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub step: OnboardingStep,
    pub step_number: u8,
    pub profile: UserProfile,
    pub can_advance: bool,
}

impl From<&Wizard> for WizardSnapshot {
    fn from(wizard: &Wizard) -> Self {
        Self {
            step: wizard.step(),
            step_number: wizard.step().number(),
            profile: wizard.profile().clone(),
            can_advance: wizard.can_advance(),
        }
    }
}

enum Session {
    Active(Wizard),
    /// The profile has been handed to the orchestrator; kept for display.
    Generating {
        profile: UserProfile,
        cancel: CancellationToken,
    },
}

impl Session {
    fn snapshot(&self) -> WizardSnapshot {
        match self {
            Self::Active(wizard) => WizardSnapshot::from(wizard),
            Self::Generating { profile, .. } => WizardSnapshot {
                step: OnboardingStep::Generating,
                step_number: OnboardingStep::Generating.number(),
                profile: profile.clone(),
                can_advance: false,
            },
        }
    }
}

/// Wizard sessions keyed by user id. A session only ever changes under the
/// registry's write lock.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. A user without a session sees a fresh wizard, but
    /// none is stored until an answer or transition arrives.
    pub async fn snapshot(&self, user_id: &str) -> WizardSnapshot {
        match self.sessions.read().await.get(user_id) {
            Some(session) => session.snapshot(),
            None => WizardSnapshot::from(&Wizard::new()),
        }
    }

    /// Run `f` against the user's wizard. Refused once generation started.
    pub async fn with_wizard<R>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut Wizard) -> R,
    ) -> Result<(R, WizardSnapshot), ValidationError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::Active(Wizard::new()));
        match session {
            Session::Active(wizard) => {
                let result = f(wizard);
                Ok((result, WizardSnapshot::from(&*wizard)))
            }
            Session::Generating { .. } => Err(ValidationError::WizardClosed),
        }
    }

    /// Take the profile out of a wizard that reached `Generating`.
    ///
    /// Returns `None` if the wizard is not terminal or generation was
    /// already handed off, so at most one caller gets the profile.
    pub async fn begin_generation(&self, user_id: &str) -> Option<(UserProfile, CancellationToken)> {
        let mut sessions = self.sessions.write().await;
        if !matches!(sessions.get(user_id), Some(Session::Active(_))) {
            return None;
        }
        let Some(Session::Active(wizard)) = sessions.remove(user_id) else {
            return None;
        };
        match wizard.into_profile() {
            Ok(profile) => {
                let cancel = CancellationToken::new();
                sessions.insert(
                    user_id.to_string(),
                    Session::Generating {
                        profile: profile.clone(),
                        cancel: cancel.clone(),
                    },
                );
                debug!(user_id, "Wizard handed off for generation");
                Some((profile, cancel))
            }
            Err(wizard) => {
                sessions.insert(user_id.to_string(), Session::Active(wizard));
                None
            }
        }
    }

    /// Drop a finished generating session. Active wizards are left alone.
    pub async fn finish(&self, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        if matches!(sessions.get(user_id), Some(Session::Generating { .. })) {
            sessions.remove(user_id);
        }
    }

    /// Tear down the user's session, cancelling any generation in flight.
    /// Returns whether a session existed.
    pub async fn discard(&self, user_id: &str) -> bool {
        match self.sessions.write().await.remove(user_id) {
            Some(Session::Generating { cancel, .. }) => {
                cancel.cancel();
                true
            }
            Some(Session::Active(_)) => true,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn walk_to_generating(registry: &SessionRegistry, user_id: &str) {
        let answers = [
            StepAnswer::Gender {
                gender: Gender::Female,
            },
            StepAnswer::Goal { goal: Goal::Gain },
            StepAnswer::WorkoutFrequency {
                workout_frequency: WorkoutFrequency::High,
            },
            StepAnswer::BirthDate {
                day: "1".to_string(),
                month: "2".to_string(),
                year: "1990".to_string(),
            },
            StepAnswer::BodyMetrics {
                height: "5.4".to_string(),
                weight: "60".to_string(),
            },
        ];
        for answer in answers {
            registry
                .with_wizard(user_id, |w| {
                    answer.apply(w).unwrap();
                    w.advance()
                })
                .await
                .unwrap();
        }
    }

    #[test]
    fn answers_deserialize_by_step_tag() {
        let answer: StepAnswer =
            serde_json::from_str(r#"{"step":"workout_frequency","workoutFrequency":"3-4 Days"}"#)
                .unwrap();
        assert_eq!(
            answer,
            StepAnswer::WorkoutFrequency {
                workout_frequency: WorkoutFrequency::Medium
            }
        );

        let answer: StepAnswer =
            serde_json::from_str(r#"{"step":"goal","goal":"Maintain Weight"}"#).unwrap();
        assert_eq!(
            answer,
            StepAnswer::Goal {
                goal: Goal::Maintain
            }
        );
    }

    #[tokio::test]
    async fn new_user_starts_at_gender() {
        let registry = SessionRegistry::new();
        let snapshot = registry.snapshot("u1").await;
        assert_eq!(snapshot.step, OnboardingStep::Gender);
        assert_eq!(snapshot.step_number, 1);
        assert!(!snapshot.can_advance);
    }

    #[tokio::test]
    async fn reading_a_snapshot_stores_nothing() {
        let registry = SessionRegistry::new();
        registry.snapshot("u4").await;
        assert!(registry.sessions.read().await.is_empty());
        assert!(!registry.discard("u4").await);

        registry
            .with_wizard("u4", |w| w.select_gender(Gender::Male))
            .await
            .unwrap();
        assert_eq!(registry.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn profile_handoff_happens_once() {
        let registry = SessionRegistry::new();
        walk_to_generating(&registry, "u1").await;

        let (profile, _cancel) = registry.begin_generation("u1").await.unwrap();
        assert_eq!(profile.gender, Some(Gender::Female));
        assert!(registry.begin_generation("u1").await.is_none());

        let snapshot = registry.snapshot("u1").await;
        assert_eq!(snapshot.step, OnboardingStep::Generating);
        assert_eq!(
            registry.with_wizard("u1", |w| w.back()).await.unwrap_err(),
            ValidationError::WizardClosed
        );
    }

    #[tokio::test]
    async fn handoff_refused_before_terminal_step() {
        let registry = SessionRegistry::new();
        registry.snapshot("u2").await;
        assert!(registry.begin_generation("u2").await.is_none());
        assert_eq!(registry.snapshot("u2").await.step, OnboardingStep::Gender);
    }

    #[tokio::test]
    async fn discard_cancels_generation() {
        let registry = SessionRegistry::new();
        walk_to_generating(&registry, "u3").await;
        let (_, cancel) = registry.begin_generation("u3").await.unwrap();

        assert!(registry.discard("u3").await);
        assert!(cancel.is_cancelled());
        assert!(!registry.discard("u3").await);
    }
}
