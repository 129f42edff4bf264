mod error;
mod http;
mod memory;
mod records;

pub use error::StoreError;
pub use http::{HttpDocumentStore, PatchBuilder};
pub use memory::MemoryStore;
pub use records::{upsert_lead, LeadStore, MailLogStore, LEAD_TYPE, SENT_EMAIL_TYPE};
