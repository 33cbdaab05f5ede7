use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;

/// Shared state for request handlers.
///
/// The server process owns its own store handle; the worker opens another
/// one on the same file.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
