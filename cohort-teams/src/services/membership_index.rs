// cohort-teams/src/services/membership_index.rs
use crate::models::{ServiceError, TeamAggregate};
use crate::utils::TeamStore;
use log::warn;
use std::sync::Arc;

/// Answers "which active team is this student in" from current store state.
///
/// Used as a guard inside a team lease. The store's unique index re-checks
/// the same rule at commit time, so a guard that raced another team's commit
/// cannot be written through.
#[derive(Clone)]
pub struct MembershipIndex {
    store: Arc<dyn TeamStore>,
}

impl MembershipIndex {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub fn is_active_member_of(&self, student_id: &str) -> Result<Option<TeamAggregate>, ServiceError> {
        let Some(team_id) = self.store.active_team_of(student_id)? else {
            return Ok(None);
        };

        match self.store.load_team(&team_id)? {
            Some(team) if team.is_active() && team.is_member(student_id) => Ok(Some(team)),
            _ => {
                warn!("Index points {} at team {} which no longer holds them", student_id, team_id);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapacityConfig, TeamStatus};
    use crate::utils::DocumentStore;

    #[test]
    fn finds_leaders_and_members_of_active_teams_only() {
        let store: Arc<dyn TeamStore> =
            Arc::new(DocumentStore::in_memory(CapacityConfig::new(4).unwrap()));
        let index = MembershipIndex::new(store.clone());

        let mut team = store.insert_team(&TeamAggregate::new("A", "leader", 4).unwrap(), 0).unwrap();
        team.members.insert("member".to_string());
        let mut team = store.commit_team(&team).unwrap();

        assert_eq!(index.is_active_member_of("leader").unwrap().unwrap().id, team.id);
        assert_eq!(index.is_active_member_of("member").unwrap().unwrap().id, team.id);
        assert!(index.is_active_member_of("outsider").unwrap().is_none());

        team.status = TeamStatus::Disbanded;
        store.commit_team(&team).unwrap();
        assert!(index.is_active_member_of("leader").unwrap().is_none());
    }
}
