//! Durable user record and identity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::onboarding::model::{FitnessPlan, UserProfile};

/// Top-level field names of the stored user document.
pub mod fields {
    pub const ID: &str = "id";
    pub const EMAIL: &str = "email";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const HAS_COMPLETED_ONBOARDING: &str = "hasCompletedOnboarding";
    pub const GENERATED_PLAN: &str = "generatedPlan";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Identity as supplied by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Fields written when the record is first created.
    pub(crate) fn initial_document(&self, now: DateTime<Utc>) -> serde_json::Map<String, serde_json::Value> {
        let mut doc = serde_json::Map::new();
        doc.insert(fields::ID.into(), self.id.clone().into());
        doc.insert(fields::EMAIL.into(), self.email.clone().into());
        doc.insert(fields::FIRST_NAME.into(), self.first_name.clone().into());
        doc.insert(fields::LAST_NAME.into(), self.last_name.clone().into());
        doc.insert(fields::HAS_COMPLETED_ONBOARDING.into(), false.into());
        doc.insert(fields::CREATED_AT.into(), now.to_rfc3339().into());
        doc
    }

    /// Identity fields this identity can supply that `doc` lacks (absent or
    /// `null`). Stored values are never replaced.
    pub(crate) fn missing_fields(
        &self,
        doc: &serde_json::Map<String, serde_json::Value>,
    ) -> serde_json::Map<String, serde_json::Value> {
        [
            (fields::EMAIL, &self.email),
            (fields::FIRST_NAME, &self.first_name),
            (fields::LAST_NAME, &self.last_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_ref()?;
            doc.get(key)
                .is_none_or(|stored| stored.is_null())
                .then(|| (key.to_string(), value.clone().into()))
        })
        .collect()
    }
}

/// The authoritative per-user document.
///
/// Profile answers live at the top level of the document next to the
/// identity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub has_completed_onboarding: bool,
    #[serde(default)]
    pub generated_plan: Option<FitnessPlan>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl UserRecord {
    /// Decode a stored document.
    pub fn from_document(
        doc: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(doc))
    }
}

/// Outcome of the sign-in record check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResult {
    pub success: bool,
    pub has_completed_onboarding: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::Gender;

    #[test]
    fn initial_document_starts_incomplete() {
        let identity = UserIdentity::new("u1")
            .with_email("a@example.com")
            .with_name("Ada", "Lovelace");
        let doc = identity.initial_document(Utc::now());
        assert_eq!(doc[fields::HAS_COMPLETED_ONBOARDING], false);
        assert_eq!(doc[fields::FIRST_NAME], "Ada");

        let record = UserRecord::from_document(doc).unwrap();
        assert_eq!(record.id, "u1");
        assert!(!record.has_completed_onboarding);
        assert!(record.generated_plan.is_none());
        assert!(record.created_at.is_some());
        assert_eq!(record.profile, UserProfile::default());
    }

    #[test]
    fn missing_fields_only_fills_gaps() {
        let stored = UserIdentity::new("u3").with_email("kept@example.com");
        let doc = stored.initial_document(Utc::now());

        let signed_in = UserIdentity::new("u3")
            .with_email("new@example.com")
            .with_name("Ada", "Lovelace");
        let missing = signed_in.missing_fields(&doc);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[fields::FIRST_NAME], "Ada");
        assert_eq!(missing[fields::LAST_NAME], "Lovelace");

        assert!(UserIdentity::new("u3").missing_fields(&doc).is_empty());
    }

    #[test]
    fn record_reads_flattened_profile_and_null_plan() {
        let doc = serde_json::json!({
            "id": "u2",
            "email": null,
            "hasCompletedOnboarding": true,
            "generatedPlan": null,
            "gender": "Female",
            "height": "5.4",
        });
        let serde_json::Value::Object(map) = doc else {
            unreachable!()
        };
        let record = UserRecord::from_document(map).unwrap();
        assert!(record.has_completed_onboarding);
        assert!(record.generated_plan.is_none());
        assert_eq!(record.profile.gender, Some(Gender::Female));
        assert_eq!(record.profile.height.as_deref(), Some("5.4"));
    }
}
