//! Domain types for machine occupancy.
//!
//! Nothing in here touches the database or HTTP; the services translate
//! between these types and the stored rows.

pub mod machine;
pub mod role;
pub mod validation;

pub use machine::{Contribution, Machine, MachineState, Occupancy, UsageLog};
pub use role::{Role, UnknownRole};
pub use validation::InvalidInput;
