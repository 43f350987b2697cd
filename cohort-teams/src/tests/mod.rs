// Shared fixtures for the service and route tests
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{CapacityConfig, InviteAction, ServiceError, TeamAggregate, TeamView, UserRole};
use crate::services::{TeamService, TeamSettings};
use crate::utils::{DirectoryEntry, DocumentStore, RetryPolicy, StaticDirectory, TeamStore};

mod team_service_tests;

pub const ADMIN: &str = "admin";

fn entry(id: &str, role: UserRole, active: bool) -> DirectoryEntry {
    DirectoryEntry {
        id: id.to_string(),
        name: format!("User {}", id),
        role,
        active,
    }
}

// Students s1..s60, one admin, one alumnus and one deactivated student
pub fn directory() -> StaticDirectory {
    let mut entries: Vec<DirectoryEntry> = (1..=60)
        .map(|n| entry(&format!("s{}", n), UserRole::Student, true))
        .collect();
    entries.push(entry(ADMIN, UserRole::Admin, true));
    entries.push(entry("alum", UserRole::Alumni, true));
    entries.push(entry("gone", UserRole::Student, false));
    StaticDirectory::from_entries(entries)
}

pub fn test_settings() -> TeamSettings {
    TeamSettings {
        invite_ttl: Some(chrono::Duration::days(7)),
        lock_timeout: Duration::from_secs(10),
        retry: RetryPolicy {
            max_attempts: 20,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        },
    }
}

pub fn service_with(default_size: u32, settings: TeamSettings) -> (TeamService, Arc<DocumentStore>) {
    let store = Arc::new(DocumentStore::in_memory(CapacityConfig::new(default_size).unwrap()));
    (service_over(store.clone(), settings), store)
}

pub fn service_over(store: Arc<dyn TeamStore>, settings: TeamSettings) -> TeamService {
    TeamService::new(store, Arc::new(directory()), settings)
}

/// Delegating store that stalls before team inserts and capacity writes,
/// widening the window between a caller's read and its write.
pub struct SlowStore {
    inner: Arc<DocumentStore>,
    insert_delay: Duration,
    resize_delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<DocumentStore>, insert_delay: Duration, resize_delay: Duration) -> Self {
        Self {
            inner,
            insert_delay,
            resize_delay,
        }
    }
}

impl TeamStore for SlowStore {
    fn load_team(&self, team_id: &str) -> Result<Option<TeamAggregate>, ServiceError> {
        self.inner.load_team(team_id)
    }

    fn insert_team(
        &self,
        team: &TeamAggregate,
        capacity_version: u64,
    ) -> Result<TeamAggregate, ServiceError> {
        std::thread::sleep(self.insert_delay);
        self.inner.insert_team(team, capacity_version)
    }

    fn commit_team(&self, team: &TeamAggregate) -> Result<TeamAggregate, ServiceError> {
        self.inner.commit_team(team)
    }

    fn active_team_of(&self, student_id: &str) -> Result<Option<String>, ServiceError> {
        self.inner.active_team_of(student_id)
    }

    fn all_teams(&self) -> Result<Vec<TeamAggregate>, ServiceError> {
        self.inner.all_teams()
    }

    fn load_capacity(&self) -> Result<CapacityConfig, ServiceError> {
        self.inner.load_capacity()
    }

    fn commit_capacity_and_resize(&self, config: &CapacityConfig) -> Result<usize, ServiceError> {
        std::thread::sleep(self.resize_delay);
        self.inner.commit_capacity_and_resize(config)
    }
}

pub fn service(default_size: u32) -> (TeamService, Arc<DocumentStore>) {
    service_with(default_size, test_settings())
}

/// Every team carries the size the capacity config currently holds.
pub fn assert_sizes_match_config(store: &DocumentStore) {
    let config = store.load_capacity().unwrap();
    for team in store.all_teams().unwrap() {
        assert_eq!(
            team.max_size, config.max_size,
            "team {} has max size {} but the config says {}",
            team.id, team.max_size, config.max_size
        );
    }
}

// Leader creates a team and every listed student joins through an accepted invite
pub fn team_with_members(service: &TeamService, leader: &str, members: &[&str]) -> TeamView {
    let team = service.create_team(leader, &format!("Team of {}", leader)).unwrap();
    for student in members {
        let invite = service.invite_member(&team.id, leader, student).unwrap();
        service
            .respond_to_invite(&team.id, &invite.id, student, InviteAction::Accept)
            .unwrap();
    }
    service.get_team(&team.id).unwrap()
}

/// Structural invariants that hold at all times, whatever admins do to sizes.
pub fn assert_structural_invariants(store: &DocumentStore) {
    let now = chrono::Utc::now();
    let mut active_teams_per_student: HashMap<String, usize> = HashMap::new();

    for team in store.all_teams().unwrap() {
        assert!(team.is_member(&team.leader_id), "leader missing from team {}", team.id);
        assert!(team.invites.duplicate_pending(now).is_none(), "duplicate pending invite in {}", team.id);
        for student in team.active_members() {
            *active_teams_per_student.entry(student.clone()).or_default() += 1;
        }
    }

    for (student, count) in active_teams_per_student {
        assert!(count <= 1, "student {} is active in {} teams", student, count);
    }
}

/// Structural invariants plus `|members| <= max_size` for every team.
pub fn assert_invariants(store: &DocumentStore) {
    assert_structural_invariants(store);
    for team in store.all_teams().unwrap() {
        assert!(
            team.size() <= team.max_size as usize,
            "team {} has {} members but max size {}",
            team.id,
            team.size(),
            team.max_size
        );
    }
}
