//! Persistence layer for finished calls
//!
//! Provides an append-only store of call records: who picked up, the
//! decision-maker contacts found, objections raised and the outcome.

pub mod error;
pub mod records;
pub mod sqlite;

pub use error::PersistenceError;
pub use records::{CallOutcome, CallRecord, CallRecordStore};
pub use sqlite::SqliteCallStore;

use std::sync::Arc;

use cold_call_config::PersistenceConfig;

/// Store for the configuration, `None` when persistence is disabled
pub fn init(config: &PersistenceConfig) -> Result<Option<Arc<dyn CallRecordStore>>, PersistenceError> {
    if !config.enabled {
        tracing::info!("Call record persistence disabled");
        return Ok(None);
    }

    let store = SqliteCallStore::open(&config.database_path)?;
    Ok(Some(Arc::new(store)))
}
