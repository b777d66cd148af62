use std::collections::HashMap;
use std::sync::Arc;

use ritual_db::Database;
use ritual_sheets::SheetsClient;
use ritual_telegram::BotApi;
use tokio::sync::RwLock;

use crate::dialog::DialogState;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub api: BotApi,
    /// `None` when mirroring is not configured.
    pub sheets: Option<SheetsClient>,
    pub sessions: Sessions,
    pub poll_timeout_secs: u64,
}

/// Per-user dialog positions. Kept in memory only; the flows are short
/// enough that users just start over after a restart.
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<i64, DialogState>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> Option<DialogState> {
        self.inner.read().await.get(&user_id).cloned()
    }

    pub async fn set(&self, user_id: i64, state: DialogState) {
        self.inner.write().await.insert(user_id, state);
    }

    pub async fn clear(&self, user_id: i64) {
        self.inner.write().await.remove(&user_id);
    }
}
