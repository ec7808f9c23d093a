pub mod alerts;
pub mod categories;
pub mod db;
pub mod settings;

use crate::store::CategoryStore;
use db::SqliteKv;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Loaded stores keyed by data directory, shared by every command.
#[derive(Default)]
pub struct StoreCache {
    stores: HashMap<String, CategoryStore<SqliteKv>>,
}

pub type SharedStores = Arc<Mutex<StoreCache>>;

/// Run `f` against the store for `data_dir` while holding the cache lock.
///
/// The store is loaded on first use and reloaded when the settings behind it
/// (namespace, growth, thresholds) have changed since it was opened.
pub fn with_store<T, F>(stores: &SharedStores, data_dir: &str, f: F) -> Result<T, String>
where
    F: FnOnce(&mut CategoryStore<SqliteKv>) -> Result<T, String>,
{
    let mut cache = stores.lock().map_err(|_| "Store lock error".to_string())?;
    let config = settings::load_store_config(data_dir)?;

    let stale = cache
        .stores
        .get(data_dir)
        .map_or(true, |store| store.config() != &config);
    if stale {
        let kv = SqliteKv::open(data_dir).map_err(|e| format!("DB error: {e}"))?;
        let store = CategoryStore::load(kv, config).map_err(|e| format!("Store error: {e}"))?;
        cache.stores.insert(data_dir.to_string(), store);
    }

    let store = cache
        .stores
        .get_mut(data_dir)
        .ok_or("Store not loaded".to_string())?;
    f(store)
}
