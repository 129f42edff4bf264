use crate::{LeadStore, MailLogStore, StoreError};
use async_trait::async_trait;
use beacon_core::{Lead, SentEmail};
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory store backend for development runs and endpoint-logic tests.
/// Records vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sent: RwLock<Vec<SentEmail>>,
    leads: RwLock<Vec<Lead>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailLogStore for MemoryStore {
    async fn list_sent(&self) -> Result<Vec<SentEmail>, StoreError> {
        let mut records = self.sent.read().await.clone();
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(records)
    }

    async fn get_sent(&self, id: &str) -> Result<Option<SentEmail>, StoreError> {
        Ok(self
            .sent
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn record_sent(&self, record: &SentEmail) -> Result<(), StoreError> {
        self.sent.write().await.push(record.clone());
        Ok(())
    }

    async fn mark_seen(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.sent.write().await;
        match records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.is_seen = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.leads.read().await.clone();
        leads.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(leads)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self
            .leads
            .read()
            .await
            .iter()
            .find(|lead| lead.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, lead: &Lead) -> Result<Lead, StoreError> {
        self.leads.write().await.push(lead.clone());
        Ok(lead.clone())
    }

    async fn update(&self, id: &str, fields: Value) -> Result<Lead, StoreError> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|lead| lead.id == id)
            .ok_or_else(|| StoreError::Data(format!("unknown lead id {id}")))?;

        if let Some(name) = fields.get("name").and_then(Value::as_str) {
            lead.name = name.to_string();
        }
        if let Some(phone) = fields.get("phone").and_then(Value::as_str) {
            lead.phone = phone.to_string();
        }
        if let Some(added_at) = fields.get("addedAt").and_then(Value::as_str) {
            lead.added_at = added_at.to_string();
        }

        Ok(lead.clone())
    }
}
