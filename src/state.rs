use std::sync::Arc;

use sqlx::PgPool;

use crate::api_keys::repo::{ApiKeyRepo, PgApiKeyRepo};
use crate::config::AppConfig;
use crate::people::repo::{PersonRepo, PgPersonRepo};
use crate::storage::{ImageStorage, LocalStorage};
use crate::users::repo::{PgUserRepo, UserRepo};

/// Shared handles injected into every handler and guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub api_keys: Arc<dyn ApiKeyRepo>,
    pub people: Arc<dyn PersonRepo>,
    pub storage: Arc<dyn ImageStorage>,
}

impl AppState {
    pub fn from_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        let storage = Arc::new(LocalStorage::new(config.upload.dir.clone())) as Arc<dyn ImageStorage>;
        Self {
            users: Arc::new(PgUserRepo::new(db.clone())),
            api_keys: Arc::new(PgApiKeyRepo::new(db.clone())),
            people: Arc::new(PgPersonRepo::new(db)),
            storage,
            config,
        }
    }

    /// State backed by in-memory stores and a temporary upload directory.
    #[cfg(test)]
    pub fn fake() -> (Self, tempfile::TempDir) {
        use crate::memory::MemoryStore;

        let upload_dir = tempfile::tempdir().expect("temp upload dir");
        let mut config =
            AppConfig::from_lookup(|_| None).expect("default config is valid");
        config.upload.dir = upload_dir.path().to_path_buf();

        let store = Arc::new(MemoryStore::new());
        let state = Self {
            users: store.clone(),
            api_keys: store.clone(),
            people: store,
            storage: Arc::new(LocalStorage::new(upload_dir.path())),
            config: Arc::new(config),
        };
        (state, upload_dir)
    }
}
