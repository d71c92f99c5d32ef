//! Storage traits — the durable user store and the local fast-path cache.

use async_trait::async_trait;

use crate::error::{CacheError, DatabaseError};

use super::model::{UserIdentity, UserRecord};

/// A JSON document keyed by user id.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Backend-agnostic durable store for user documents.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read a user's record, `None` if it does not exist.
    async fn read_user_record(&self, user_id: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// Read the raw stored document.
    async fn read_document(&self, user_id: &str) -> Result<Option<Document>, DatabaseError>;

    /// Create the record with `hasCompletedOnboarding = false`.
    ///
    /// Idempotent: an existing record keeps its flag and data, and its
    /// current completion flag is returned. Identity fields the record
    /// lacks are filled in from `identity`.
    async fn create_user_record(&self, identity: &UserIdentity) -> Result<bool, DatabaseError>;

    /// Shallow-merge `update` into the document (creating it if missing).
    /// Top-level fields not named in `update` are preserved; `updatedAt` is
    /// always stamped.
    async fn merge_user_record(&self, user_id: &str, update: Document) -> Result<(), DatabaseError>;
}

/// Local mirror of each user's completion flag.
///
/// A cache, never the source of truth.
#[async_trait]
pub trait FlagCache: Send + Sync {
    /// `None` means unknown (never written, or unreadable).
    async fn read_flag(&self, user_id: &str) -> Result<Option<bool>, CacheError>;

    async fn write_flag(&self, user_id: &str, completed: bool) -> Result<(), CacheError>;
}

/// Cache key for a user's onboarding flag.
pub fn flag_key(user_id: &str) -> String {
    format!("onboarding_{user_id}")
}
