use crate::config::Config;
use crate::store::{Db, new_db};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
}

impl AppState {
    /// Fresh, empty store.
    pub fn new(config: Config) -> Self {
        Self {
            db: new_db(),
            config,
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
