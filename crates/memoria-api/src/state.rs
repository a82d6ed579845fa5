use std::sync::Arc;

use sqlx::PgPool;

use memoria_core::Config;
use memoria_db::MemorialRepository;
use memoria_storage::UploadBroker;
use memoria_sync::SyncCoordinator;

/// Main application state. Everything here is cheap to clone: the pool,
/// repository, and broker are handles. No ambient globals; every handler
/// gets its collaborators through this struct.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub repository: MemorialRepository,
    pub broker: Arc<dyn UploadBroker>,
    pub coordinator: SyncCoordinator,
}

#[allow(dead_code)]
fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<AppState>();
    assert_sync::<AppState>();
}
