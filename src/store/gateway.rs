//! Persistence gateway — keeps the durable user record and the local
//! completion cache consistent.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{DatabaseError, PersistenceError};
use crate::onboarding::model::{FitnessPlan, UserProfile};

use super::model::{SignInResult, UserIdentity, UserRecord, fields};
use super::traits::{Document, FlagCache, UserStore};

/// Durable store plus fast-path cache. The durable record is authoritative;
/// the cache is rewritten whenever the durable flag is established.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn FlagCache>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn FlagCache>) -> Self {
        Self { store, cache }
    }

    /// Ensure the durable record exists (filling in identity fields it
    /// lacks) and mirror a completed flag locally.
    ///
    /// Only `true` is ever cached; the durable flag never reverts.
    ///
    /// Store failures are logged and reported as `success = false`, which
    /// callers treat as "onboarding not completed".
    pub async fn sign_in(&self, identity: &UserIdentity) -> SignInResult {
        match self.store.create_user_record(identity).await {
            Ok(completed) => {
                if completed {
                    self.mirror_completed(&identity.id).await;
                }
                SignInResult {
                    success: true,
                    has_completed_onboarding: completed,
                }
            }
            Err(e) => {
                error!(user_id = %identity.id, error = %e, "Failed to create or read user record");
                SignInResult {
                    success: false,
                    has_completed_onboarding: false,
                }
            }
        }
    }

    /// Decide whether the user has finished onboarding. Never writes the
    /// durable record.
    ///
    /// A cached `true` is trusted without a round trip (the durable flag
    /// never reverts). Anything else falls through to the durable record,
    /// which also resynchronizes the cache. A missing or unreadable record
    /// counts as not completed.
    pub async fn resolve_onboarding(&self, user_id: &str) -> bool {
        if self.read_local_flag(user_id).await == Some(true) {
            debug!(user_id, "Onboarding completion served from local cache");
            return true;
        }
        match self.store.read_user_record(user_id).await {
            Ok(Some(record)) => {
                if record.has_completed_onboarding {
                    self.mirror_completed(user_id).await;
                }
                record.has_completed_onboarding
            }
            Ok(None) => false,
            Err(e) => {
                error!(user_id, error = %e, "Failed to read user record");
                false
            }
        }
    }

    /// Cached flag; read failures count as unknown.
    pub async fn read_local_flag(&self, user_id: &str) -> Option<bool> {
        match self.cache.read_flag(user_id).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to read local onboarding flag");
                None
            }
        }
    }

    /// Record onboarding as complete, with or without a plan.
    ///
    /// Writes `{...profile, generatedPlan, hasCompletedOnboarding: true}` as
    /// a merge, then sets the local flag. Repeating the call with the same
    /// inputs leaves an equivalent record.
    pub async fn complete_onboarding(
        &self,
        user_id: &str,
        profile: &UserProfile,
        plan: Option<&FitnessPlan>,
    ) -> Result<(), PersistenceError> {
        let update = completion_fields(profile, plan)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.store.merge_user_record(user_id, update).await?;
        self.cache.write_flag(user_id, true).await?;

        info!(user_id, has_plan = plan.is_some(), "Onboarding completion persisted");
        Ok(())
    }

    pub async fn read_user_record(&self, user_id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.store.read_user_record(user_id).await
    }

    /// The stored plan, if one was generated.
    pub async fn read_plan(&self, user_id: &str) -> Result<Option<FitnessPlan>, DatabaseError> {
        Ok(self
            .store
            .read_user_record(user_id)
            .await?
            .and_then(|r| r.generated_plan))
    }

    async fn mirror_completed(&self, user_id: &str) {
        if let Err(e) = self.cache.write_flag(user_id, true).await {
            warn!(user_id, error = %e, "Failed to mirror onboarding flag locally");
        }
    }
}

/// Document fields written at onboarding completion.
fn completion_fields(
    profile: &UserProfile,
    plan: Option<&FitnessPlan>,
) -> Result<Document, serde_json::Error> {
    let mut update = profile.to_document_fields();
    update.insert(
        fields::GENERATED_PLAN.into(),
        match plan {
            Some(plan) => serde_json::to_value(plan)?,
            None => serde_json::Value::Null,
        },
    );
    update.insert(fields::HAS_COMPLETED_ONBOARDING.into(), true.into());
    Ok(update)
}
