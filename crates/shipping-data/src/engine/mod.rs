//! Storage engines and the engine factory.

mod constraints;
mod evaluate;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use tracing::info;

use shipping_core::AppResult;
use shipping_core::config::{AppConfig, StorageEngineKind};
use shipping_core::traits::StorageEngine;

use crate::connection::DatabasePool;

pub use memory::MemoryEngine;
pub use postgres::PostgresEngine;

/// Build the storage engine selected by `config.storage.engine`.
pub async fn connect_engine(config: &AppConfig) -> AppResult<Arc<dyn StorageEngine>> {
    let engine: Arc<dyn StorageEngine> = match config.storage.engine {
        StorageEngineKind::Memory => Arc::new(MemoryEngine::new()),
        StorageEngineKind::Postgres => {
            let pool = DatabasePool::connect(&config.database).await?;
            Arc::new(PostgresEngine::new(pool))
        }
    };
    info!(engine = engine.name(), "Storage engine ready");
    Ok(engine)
}
