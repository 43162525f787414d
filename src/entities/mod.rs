pub mod prelude;

pub mod contributions;
pub mod machines;
pub mod sessions;
pub mod usage_logs;
pub mod users;
