pub mod machine;
pub mod occupancy;
pub mod session;
pub mod usage_log;
pub mod user;
