mod logs;
mod machine;
mod user;

pub use logs::cmd_logs;
pub use machine::{cmd_machine_add, cmd_machine_list, cmd_machine_remove};
pub use user::{cmd_user_create, cmd_user_list, cmd_user_promote};

use chrono::Utc;

use crate::db::User;
use crate::domain::Role;

/// Actor for commands run from the console. Holds manager rights since
/// whoever runs the binary already owns the database.
pub(crate) fn console_actor() -> User {
    User {
        id: 0,
        name: "console".to_string(),
        email: "console@localhost".to_string(),
        role: Role::Manager,
        created_at: Utc::now(),
    }
}
