use crate::{HttpDocumentStore, StoreError};
use async_trait::async_trait;
use beacon_core::{Lead, LeadDraft, SentEmail};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// Document type tags in the hosted store; wire constants shared with the
/// dashboard's historical dataset.
pub const SENT_EMAIL_TYPE: &str = "sentEmails";
pub const LEAD_TYPE: &str = "lead";

/// Sent-mail records and their open-tracking state.
#[async_trait]
pub trait MailLogStore: Send + Sync {
    /// All sent records, newest first.
    async fn list_sent(&self) -> Result<Vec<SentEmail>, StoreError>;

    async fn get_sent(&self, id: &str) -> Result<Option<SentEmail>, StoreError>;

    async fn record_sent(&self, record: &SentEmail) -> Result<(), StoreError>;

    /// Flip a record to seen. Returns false when no record matches the id.
    async fn mark_seen(&self, id: &str) -> Result<bool, StoreError>;
}

/// CRM lead records.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// All leads, newest first.
    async fn list(&self) -> Result<Vec<Lead>, StoreError>;

    /// Case-insensitive match on the stored (lowercased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError>;

    async fn create(&self, lead: &Lead) -> Result<Lead, StoreError>;

    async fn update(&self, id: &str, fields: Value) -> Result<Lead, StoreError>;
}

/// Update the existing lead matched case-insensitively by email, otherwise
/// create a new one. Returns the stored lead and whether it was an update.
pub async fn upsert_lead(
    store: &dyn LeadStore,
    draft: &LeadDraft,
) -> Result<(Lead, bool), StoreError> {
    let email = draft.email.trim().to_lowercase();
    let added_at = draft
        .added_at
        .clone()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    if let Some(existing) = store.find_by_email(&email).await? {
        let updated = store
            .update(
                &existing.id,
                json!({
                    "name": draft.name.trim(),
                    "phone": draft.phone.trim(),
                    "addedAt": added_at,
                }),
            )
            .await?;
        return Ok((updated, true));
    }

    let lead = Lead {
        id: Uuid::new_v4().to_string(),
        name: draft.name.trim().to_string(),
        email,
        phone: draft.phone.trim().to_string(),
        added_at,
    };
    let created = store.create(&lead).await?;
    Ok((created, false))
}

#[async_trait]
impl MailLogStore for HttpDocumentStore {
    async fn list_sent(&self) -> Result<Vec<SentEmail>, StoreError> {
        let result = self
            .fetch(r#"*[_type == "sentEmails"] | order(sentAt desc)"#, &[])
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn get_sent(&self, id: &str) -> Result<Option<SentEmail>, StoreError> {
        let result = self
            .fetch(
                r#"*[_type == "sentEmails" && _id == $id][0]"#,
                &[("id", json!(id))],
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn record_sent(&self, record: &SentEmail) -> Result<(), StoreError> {
        let mut doc = serde_json::to_value(record)?;
        doc["_type"] = json!(SENT_EMAIL_TYPE);
        self.create(doc).await?;
        Ok(())
    }

    async fn mark_seen(&self, id: &str) -> Result<bool, StoreError> {
        if self.get_sent(id).await?.is_none() {
            return Ok(false);
        }
        self.patch(id).set(json!({ "isSeen": true })).commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl LeadStore for HttpDocumentStore {
    async fn list(&self) -> Result<Vec<Lead>, StoreError> {
        let result = self
            .fetch(r#"*[_type == "lead"] | order(addedAt desc)"#, &[])
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError> {
        let result = self
            .fetch(
                r#"*[_type == "lead" && email == $email][0]"#,
                &[("email", json!(email.to_lowercase()))],
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn create(&self, lead: &Lead) -> Result<Lead, StoreError> {
        let mut doc = serde_json::to_value(lead)?;
        doc["_type"] = json!(LEAD_TYPE);
        let stored = HttpDocumentStore::create(self, doc).await?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn update(&self, id: &str, fields: Value) -> Result<Lead, StoreError> {
        let stored = self.patch(id).set(fields).commit().await?;
        Ok(serde_json::from_value(stored)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn draft(name: &str, email: &str, phone: &str) -> LeadDraft {
        LeadDraft {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            added_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_case_insensitively() {
        let store = MemoryStore::new();

        let (first, updated) = upsert_lead(&store, &draft("A", "X@Y.com", "1"))
            .await
            .expect("first upsert");
        assert!(!updated);
        assert_eq!(first.email, "x@y.com");

        let (second, updated) = upsert_lead(&store, &draft("B", "x@y.com", "2"))
            .await
            .expect("second upsert");
        assert!(updated);
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "B");
        assert_eq!(second.phone, "2");

        let all = LeadStore::list(&store).await.expect("lead listing");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "B");
        assert_eq!(all[0].phone, "2");
    }

    #[tokio::test]
    async fn upsert_trims_fields_and_keeps_supplied_added_at() {
        let store = MemoryStore::new();
        let mut lead = draft("  Ada  ", "  ADA@example.com ", " 555 ");
        lead.added_at = Some("2025-01-01T00:00:00.000Z".to_string());

        let (stored, _) = upsert_lead(&store, &lead).await.expect("upsert");
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.phone, "555");
        assert_eq!(stored.added_at, "2025-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent_and_reports_unknown_ids() {
        let store = MemoryStore::new();
        store
            .record_sent(&SentEmail {
                id: "mail-1".to_string(),
                to: "a@b.com".to_string(),
                subject: "s".to_string(),
                message: "m".to_string(),
                sent_at: "2025-01-01T00:00:00.000Z".to_string(),
                is_seen: false,
            })
            .await
            .expect("record stored");

        assert!(store.mark_seen("mail-1").await.expect("first mark"));
        assert!(store.mark_seen("mail-1").await.expect("second mark"));
        let record = store
            .get_sent("mail-1")
            .await
            .expect("lookup")
            .expect("record exists");
        assert!(record.is_seen);

        assert!(!store.mark_seen("missing").await.expect("unknown id"));
    }

    #[tokio::test]
    async fn sent_listing_is_newest_first() {
        let store = MemoryStore::new();
        for (id, stamp) in [
            ("old", "2025-01-01T00:00:00.000Z"),
            ("new", "2025-06-01T00:00:00.000Z"),
            ("mid", "2025-03-01T00:00:00.000Z"),
        ] {
            store
                .record_sent(&SentEmail {
                    id: id.to_string(),
                    to: "a@b.com".to_string(),
                    subject: "s".to_string(),
                    message: "m".to_string(),
                    sent_at: stamp.to_string(),
                    is_seen: false,
                })
                .await
                .expect("record stored");
        }

        let listed = store.list_sent().await.expect("listing");
        let ids: Vec<&str> = listed.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
