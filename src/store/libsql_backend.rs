//! libSQL backend — async `UserStore` implementation.
//!
//! Each user is one row holding the JSON document. Supports local file and
//! in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::model::{UserIdentity, UserRecord, fields};
use crate::store::traits::{Document, UserStore};

/// libSQL user store.
///
/// Stores a single connection that is reused for all operations. Merges
/// are read-modify-write, so they are serialized through `write_lock`.
pub struct LibSqlUserStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    write_lock: Mutex<()>,
}

impl LibSqlUserStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn upsert_document(&self, user_id: &str, doc: &Document) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let document = serde_json::to_string(doc)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO users (id, document, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (id) DO UPDATE SET document = ?2, updated_at = ?3",
                params![user_id, document, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_document: {e}")))?;
        Ok(())
    }
}

/// Parse a stored document column.
fn parse_document(user_id: &str, raw: &str) -> Result<Document, DatabaseError> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(DatabaseError::Serialization(format!(
            "document for user {user_id} is not a JSON object"
        ))),
        Err(e) => Err(DatabaseError::Serialization(format!(
            "document for user {user_id}: {e}"
        ))),
    }
}

#[async_trait]
impl UserStore for LibSqlUserStore {
    async fn read_user_record(&self, user_id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        match self.read_document(user_id).await? {
            Some(doc) => UserRecord::from_document(doc)
                .map(Some)
                .map_err(|e| DatabaseError::Serialization(format!("user {user_id}: {e}"))),
            None => Ok(None),
        }
    }

    async fn read_document(&self, user_id: &str) -> Result<Option<Document>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT document FROM users WHERE id = ?1", params![user_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("read_document: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("read_document: {e}")))?;
                parse_document(user_id, &raw).map(Some)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("read_document: {e}"))),
        }
    }

    async fn create_user_record(&self, identity: &UserIdentity) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock.lock().await;

        if let Some(mut doc) = self.read_document(&identity.id).await? {
            let completed = doc
                .get(fields::HAS_COMPLETED_ONBOARDING)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            debug!(user_id = %identity.id, completed, "User record already exists");

            let missing = identity.missing_fields(&doc);
            if !missing.is_empty() {
                doc.extend(missing);
                doc.insert(fields::UPDATED_AT.into(), Utc::now().to_rfc3339().into());
                self.upsert_document(&identity.id, &doc).await?;
                info!(user_id = %identity.id, "User record identity backfilled");
            }
            return Ok(completed);
        }

        let doc = identity.initial_document(Utc::now());
        self.upsert_document(&identity.id, &doc).await?;
        info!(user_id = %identity.id, "User record created");
        Ok(false)
    }

    async fn merge_user_record(&self, user_id: &str, update: Document) -> Result<(), DatabaseError> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now().to_rfc3339();
        let mut doc = self.read_document(user_id).await?.unwrap_or_default();
        if !doc.contains_key(fields::ID) {
            doc.insert(fields::ID.into(), user_id.into());
        }
        if !doc.contains_key(fields::CREATED_AT) {
            doc.insert(fields::CREATED_AT.into(), now.clone().into());
        }
        doc.extend(update);
        doc.insert(fields::UPDATED_AT.into(), now.into());

        self.upsert_document(user_id, &doc).await?;
        debug!(user_id, "User record merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_db() -> LibSqlUserStore {
        LibSqlUserStore::new_memory().await.unwrap()
    }

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn read_missing_record() {
        let db = test_db().await;
        assert!(db.read_user_record("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let db = test_db().await;
        let identity = UserIdentity::new("u1").with_email("u1@example.com");

        assert!(!db.create_user_record(&identity).await.unwrap());
        db.merge_user_record(
            "u1",
            doc(json!({"hasCompletedOnboarding": true, "gender": "Male"})),
        )
        .await
        .unwrap();

        // Second create reports the stored flag and replaces nothing.
        let renamed = UserIdentity::new("u1").with_email("other@example.com");
        assert!(db.create_user_record(&renamed).await.unwrap());

        let record = db.read_user_record("u1").await.unwrap().unwrap();
        assert_eq!(record.email.as_deref(), Some("u1@example.com"));
        assert!(record.has_completed_onboarding);
    }

    #[tokio::test]
    async fn create_fills_identity_fields_left_null() {
        let db = test_db().await;
        db.create_user_record(&UserIdentity::new("u5")).await.unwrap();

        let full = UserIdentity::new("u5")
            .with_email("u5@example.com")
            .with_name("Grace", "Hopper");
        assert!(!db.create_user_record(&full).await.unwrap());

        let record = db.read_user_record("u5").await.unwrap().unwrap();
        assert_eq!(record.email.as_deref(), Some("u5@example.com"));
        assert_eq!(record.first_name.as_deref(), Some("Grace"));
        assert_eq!(record.last_name.as_deref(), Some("Hopper"));
        assert!(!record.has_completed_onboarding);
    }

    #[tokio::test]
    async fn merge_preserves_untouched_fields() {
        let db = test_db().await;
        db.create_user_record(&UserIdentity::new("u2").with_name("Ada", "Lovelace"))
            .await
            .unwrap();
        let created = db.read_document("u2").await.unwrap().unwrap();

        db.merge_user_record("u2", doc(json!({"goal": "Gain Weight"})))
            .await
            .unwrap();

        let merged = db.read_document("u2").await.unwrap().unwrap();
        assert_eq!(merged["firstName"], "Ada");
        assert_eq!(merged["goal"], "Gain Weight");
        assert_eq!(merged[fields::CREATED_AT], created[fields::CREATED_AT]);
        assert!(merged.contains_key(fields::UPDATED_AT));
    }

    #[tokio::test]
    async fn merge_creates_missing_document() {
        let db = test_db().await;
        db.merge_user_record("u3", doc(json!({"hasCompletedOnboarding": true})))
            .await
            .unwrap();
        let record = db.read_user_record("u3").await.unwrap().unwrap();
        assert_eq!(record.id, "u3");
        assert!(record.has_completed_onboarding);
        assert!(record.created_at.is_some());
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn merge_overwrites_with_null() {
        let db = test_db().await;
        db.merge_user_record("u4", doc(json!({"generatedPlan": {"x": 1}})))
            .await
            .unwrap();
        db.merge_user_record("u4", doc(json!({"generatedPlan": null})))
            .await
            .unwrap();
        let stored = db.read_document("u4").await.unwrap().unwrap();
        assert!(stored["generatedPlan"].is_null());
    }
}
