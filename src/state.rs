use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::database::Store;
use crate::session::SessionStore;

/// Shared handles every handler reaches through `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, sessions: Arc<dyn SessionStore>) -> Self {
        let tokens = TokenIssuer::new(&config.security);
        Self {
            config: Arc::new(config),
            store,
            sessions,
            tokens,
        }
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.security.cookie_secure
    }
}
