pub use super::contributions::Entity as Contributions;
pub use super::machines::Entity as Machines;
pub use super::sessions::Entity as Sessions;
pub use super::usage_logs::Entity as UsageLogs;
pub use super::users::Entity as Users;
