use serde::{Deserialize, Serialize};

/// Display record built from one fetched inbox message.
///
/// Records exist for a single fetch/render cycle: they are created fresh on
/// every inbox load, never mutated, and replaced wholesale by the next fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    /// Position in the fetched batch. List identity only, not a stable
    /// mailbox identifier.
    pub sequence_id: usize,
    pub sender_display: String,
    pub sender_full: String,
    pub subject_display: String,
    pub subject_full: String,
    pub preview_display: String,
    pub preview_full: String,
    /// The header's date value verbatim, or the fetch time when absent.
    pub received_at: String,
    pub is_unread: bool,
    /// HTML fragment ready for the detail pane.
    pub renderable_body: String,
    pub is_html: bool,
}

/// Persisted record of one outbound message; `id` doubles as the tracking
/// identifier embedded in the pixel URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SentEmail {
    #[serde(rename = "_id")]
    pub id: String,
    pub to: String,
    pub subject: String,
    /// The operator's raw message text, before HTML composition.
    pub message: String,
    pub sent_at: String,
    pub is_seen: bool,
}

/// CRM lead record. Emails are stored lowercased so the upsert match is
/// case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub added_at: String,
}

/// Fields accepted when creating or updating a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub added_at: Option<String>,
}
