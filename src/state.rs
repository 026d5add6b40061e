use crate::adapters::SystemClock;
use crate::auth::AuthState;
use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::storage::Database;

use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthState,
    pub db: Database,
    pub cache: Arc<Mutex<ResponseCache<SystemClock>>>,
}
