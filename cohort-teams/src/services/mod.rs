pub mod capacity_policy;
pub mod membership_index;
pub mod team_service;

pub use capacity_policy::CapacityPolicy;
pub use membership_index::MembershipIndex;
pub use team_service::{TeamService, TeamSettings};
