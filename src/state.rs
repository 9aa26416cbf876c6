//! Shared application state for all routes. Holds no records; all record state lives in storage.

use crate::store::SessionProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
}

impl AppState {
    pub fn new(sessions: impl SessionProvider + 'static) -> Self {
        AppState {
            sessions: Arc::new(sessions),
        }
    }
}
