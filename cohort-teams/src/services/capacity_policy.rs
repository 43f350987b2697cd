// cohort-teams/src/services/capacity_policy.rs
use crate::models::{validate_team_size, CapacityConfig, ServiceError};
use crate::utils::{RetryPolicy, TeamStore};
use log::info;
use std::sync::Arc;

/// Serves the default team size and pushes admin changes out to every team.
#[derive(Clone)]
pub struct CapacityPolicy {
    store: Arc<dyn TeamStore>,
    retry: RetryPolicy,
}

impl CapacityPolicy {
    pub fn new(store: Arc<dyn TeamStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn current(&self) -> Result<u32, ServiceError> {
        Ok(self.store.load_capacity()?.max_size)
    }

    pub fn config(&self) -> Result<CapacityConfig, ServiceError> {
        self.store.load_capacity()
    }

    /// Record `new_size` as the default and set it on every team, active or
    /// not, in a single store write. Members are never evicted. Teams being
    /// changed at the same time see a version mismatch and retry on the new
    /// size.
    pub fn apply_to_all(&self, new_size: u32) -> Result<usize, ServiceError> {
        validate_team_size(new_size)?;

        let teams_updated = self.retry.run("update team size", || {
            let next = self.store.load_capacity()?.revise(new_size)?;
            self.store.commit_capacity_and_resize(&next)
        })?;

        info!("✅ Applied team size {} to {} teams", new_size, teams_updated);
        Ok(teams_updated)
    }
}
