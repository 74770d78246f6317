use crate::data::Database;
use async_trait::async_trait;
use spinneret_engine::error::{EngineError, Result};
use spinneret_engine::resource::Resource;
use spinneret_engine::site::Site;
use spinneret_engine::store::ResourceStore;
use std::sync::Mutex;

/// The engine's `ResourceStore` backed by the embedded database. rusqlite
/// connections are not `Sync`, so the database sits behind a mutex; every
/// operation is a short synchronous statement.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn into_inner(self) -> Database {
        match self.db.into_inner() {
            Ok(db) => db,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| EngineError::Store("database mutex poisoned".to_string()))
    }
}

fn store_err(err: rusqlite::Error) -> EngineError {
    EngineError::Store(err.to_string())
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn get_next_to_crawl(
        &self,
        site_id: &str,
        frequency_hours: Option<f64>,
    ) -> Result<Option<Resource>> {
        self.lock()?
            .next_to_crawl(site_id, frequency_hours)
            .map_err(store_err)
    }

    async fn commit_discoveries(&self, site: &Site, urls: &[String], depth: u32) -> Result<()> {
        self.lock()?
            .insert_discoveries(site, urls, depth)
            .map_err(store_err)
    }

    async fn update(&self, resource: &Resource) -> Result<()> {
        self.lock()?.update_resource(resource).map_err(store_err)
    }

    async fn save(&self, resource: &Resource) -> Result<i64> {
        self.lock()?.save_resource(resource).map_err(store_err)
    }
}
