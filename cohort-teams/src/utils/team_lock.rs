// cohort-teams/src/utils/team_lock.rs
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::models::ServiceError;

// Lease entry for one team
#[derive(Clone, Debug)]
struct TeamLease {
    holder: String,
    acquired_at: Instant,
}

#[derive(Default)]
struct LeaseTable {
    leases: Mutex<HashMap<String, TeamLease>>,
    released: Condvar,
}

/// Per-team mutation leases. A team has at most one holder at a time; other
/// callers wait until it is released or their timeout passes.
#[derive(Clone, Default)]
pub struct TeamLockRegistry {
    table: Arc<LeaseTable>,
}

/// Held lease; released on drop.
pub struct TeamLeaseGuard {
    registry: TeamLockRegistry,
    team_id: String,
}

impl TeamLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn leases(&self) -> Result<MutexGuard<'_, HashMap<String, TeamLease>>, ServiceError> {
        self.table.leases.lock().map_err(|e| {
            error!("Lease table poisoned: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    // Wait for the team's lease, giving up after `timeout`
    pub fn acquire(
        &self,
        team_id: &str,
        holder: &str,
        timeout: Duration,
    ) -> Result<TeamLeaseGuard, ServiceError> {
        let deadline = Instant::now() + timeout;
        let mut leases = self.leases()?;

        while let Some(current) = leases.get(team_id).map(|lease| lease.holder.clone()) {
            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out waiting for team {} held by {}", team_id, current);
                return Err(ServiceError::Concurrency(format!(
                    "timed out waiting for team {}",
                    team_id
                )));
            }
            let (guard, _) = self
                .table
                .released
                .wait_timeout(leases, deadline - now)
                .map_err(|e| {
                    error!("Lease table poisoned while waiting: {:?}", e);
                    ServiceError::InternalServerError
                })?;
            leases = guard;
        }

        leases.insert(
            team_id.to_string(),
            TeamLease {
                holder: holder.to_string(),
                acquired_at: Instant::now(),
            },
        );
        debug!("Acquired lease for team_id={}, holder={}", team_id, holder);

        Ok(TeamLeaseGuard {
            registry: self.clone(),
            team_id: team_id.to_string(),
        })
    }

    fn release(&self, team_id: &str) {
        match self.table.leases.lock() {
            Ok(mut leases) => {
                if let Some(lease) = leases.remove(team_id) {
                    debug!(
                        "Released lease for team_id={}, holder={}, held for {:?}",
                        team_id,
                        lease.holder,
                        lease.acquired_at.elapsed()
                    );
                }
            }
            Err(e) => error!("Lease table poisoned on release of {}: {:?}", team_id, e),
        }
        self.table.released.notify_all();
    }

    #[cfg(test)]
    pub fn is_locked(&self, team_id: &str) -> bool {
        self.leases()
            .map(|leases| leases.contains_key(team_id))
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub fn held_count(&self) -> usize {
        self.leases().map(|leases| leases.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl TeamLeaseGuard {
    pub fn team_id(&self) -> &str {
        &self.team_id
    }
}

impl Drop for TeamLeaseGuard {
    fn drop(&mut self) {
        self.registry.release(&self.team_id);
    }
}
