use crate::auth::SessionStore;
use anyhow::Context;
use beacon_config::{AppConfig, ConfigManager, StoreBackend};
use beacon_mail::MailService;
use beacon_store::{HttpDocumentStore, LeadStore, MailLogStore, MemoryStore};
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub mail: MailService,
    pub sent_mail: Arc<dyn MailLogStore>,
    pub leads: Arc<dyn LeadStore>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn initialize() -> anyhow::Result<Self> {
        let config_manager = ConfigManager::new().context("initialize config manager")?;
        let config = config_manager.load().context("load app config")?;
        tracing::info!(path = %config_manager.config_path().display(), "loaded configuration");
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        let mail = MailService::new(config.imap.clone(), config.smtp.clone());

        let (sent_mail, leads): (Arc<dyn MailLogStore>, Arc<dyn LeadStore>) =
            match config.store.backend {
                StoreBackend::Http => {
                    let store = Arc::new(HttpDocumentStore::new(&config.store));
                    (store.clone(), store)
                }
                StoreBackend::Memory => {
                    tracing::warn!("using in-memory document store; records vanish on restart");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            };

        Self {
            config,
            mail,
            sent_mail,
            leads,
            sessions: SessionStore::new(),
        }
    }
}
