pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, IssuedSession};
pub use auth_service_impl::SeaOrmAuthService;

pub mod occupancy_service;
pub mod occupancy_service_impl;
pub use occupancy_service::{
    ContributorView, MachineOverview, OccupancyError, OccupancyService, ReleaseSummary,
    UsageRequest,
};
pub use occupancy_service_impl::SeaOrmOccupancyService;
