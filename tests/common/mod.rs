#![allow(dead_code)]

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use labtrack::config::Config;
use labtrack::db::{Store, User};
use labtrack::domain::Role;
use labtrack::state::SharedState;
use tempfile::TempDir;

pub const PASSWORD: &str = "secret-pw";

/// Services over a database living in a temp dir. The dir, including the
/// SQLite WAL files, is removed when this is dropped.
pub struct TestState {
    pub shared: Arc<SharedState>,
    _dir: TempDir,
}

impl Deref for TestState {
    type Target = SharedState;

    fn deref(&self) -> &SharedState {
        &self.shared
    }
}

/// Argon2 costs turned down so hashing is fast.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", dir.join("labtrack.db").display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config
}

pub async fn test_state() -> TestState {
    test_state_with(|_| {}).await
}

pub async fn test_state_with(configure: impl FnOnce(&mut Config)) -> TestState {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(dir.path());
    configure(&mut config);

    let store = Store::with_pool_options(&config.general.database_path, 4, 1)
        .await
        .expect("Failed to open test database");

    TestState {
        shared: Arc::new(SharedState::with_store(config, store)),
        _dir: dir,
    }
}

pub async fn seed_user(state: &SharedState, name: &str, role: Role) -> User {
    let email = format!("{}@example.com", name.to_lowercase());
    state
        .auth
        .create_user(name, &email, PASSWORD, role)
        .await
        .expect("Failed to create user")
}

pub async fn seed_machine(state: &SharedState, ip: &str) {
    assert!(state.store.add_machine(ip).await.unwrap());
}
