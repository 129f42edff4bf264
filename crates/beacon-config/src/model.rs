use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    pub server: ServerConfig,
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Externally reachable base URL, used to build tracking pixel links.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub mailbox: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Relaxes TLS certificate verification for servers with broken chains.
    pub danger_accept_invalid_certs: bool,
    /// Bound on the whole connect/fetch cycle of one inbox load.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    /// Defaults to the SMTP username when unset.
    pub from_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Http,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub token: Option<String>,
    /// Full API base override; when unset the URL is derived from
    /// `project_id` and `api_version`.
    pub endpoint: Option<String>,
}

/// Operator credentials checked by the login endpoint. Login is refused
/// while the password is left empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerConfig {
                bind_addr: "127.0.0.1:8787".to_string(),
                public_base_url: "http://localhost:8787".to_string(),
            },
            imap: ImapConfig {
                host: "imap.gmail.com".to_string(),
                port: 993,
                mailbox: "INBOX".to_string(),
                username: None,
                password: None,
                danger_accept_invalid_certs: false,
                timeout_secs: 20,
            },
            smtp: SmtpConfig {
                host: "smtp.gmail.com".to_string(),
                port: 465,
                username: None,
                password: None,
                from_name: "Beacon".to_string(),
                from_address: None,
            },
            store: StoreConfig {
                backend: StoreBackend::Http,
                project_id: String::new(),
                dataset: "production".to_string(),
                api_version: "2023-03-01".to_string(),
                token: None,
                endpoint: None,
            },
            auth: AuthConfig {
                username: "operator".to_string(),
                password: String::new(),
            },
        }
    }
}
