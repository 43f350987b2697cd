// cohort-teams/src/utils/team_storage.rs
use crate::models::{CapacityConfig, ServiceError, TeamAggregate};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Persistence for team aggregates and the capacity config.
///
/// Writes are compare-and-swap on the aggregate's `version`, and the store
/// keeps a unique student -> active team index that every write must respect.
pub trait TeamStore: Send + Sync {
    fn load_team(&self, team_id: &str) -> Result<Option<TeamAggregate>, ServiceError>;

    /// Store a brand-new team sized from the capacity config at
    /// `capacity_version`. Fails if that config has since been replaced, the
    /// id exists, or any member is already active in another team.
    fn insert_team(
        &self,
        team: &TeamAggregate,
        capacity_version: u64,
    ) -> Result<TeamAggregate, ServiceError>;

    /// Replace a stored team. `team.version` must equal the stored version;
    /// the returned aggregate carries the bumped version.
    fn commit_team(&self, team: &TeamAggregate) -> Result<TeamAggregate, ServiceError>;

    fn active_team_of(&self, student_id: &str) -> Result<Option<String>, ServiceError>;

    fn all_teams(&self) -> Result<Vec<TeamAggregate>, ServiceError>;

    fn load_capacity(&self) -> Result<CapacityConfig, ServiceError>;

    /// Replace the capacity config and set every team's `max_size` to it in
    /// one write. `config.version` must be exactly one past the stored
    /// version. Returns the number of teams the size was applied to.
    fn commit_capacity_and_resize(&self, config: &CapacityConfig) -> Result<usize, ServiceError>;
}

struct StoreState {
    teams: HashMap<String, TeamAggregate>,
    capacity: CapacityConfig,
    student_index: HashMap<String, String>,
}

// On-disk layout of the store
#[derive(Deserialize, Debug)]
struct StoreDocument {
    capacity: CapacityConfig,
    teams: Vec<TeamAggregate>,
}

// Same layout, borrowed from the live state for writing
#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    capacity: &'a CapacityConfig,
    teams: Vec<&'a TeamAggregate>,
}

/// Single-document store: the whole state lives in memory and, when opened
/// on a path, is rewritten to a JSON file on every commit.
pub struct DocumentStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory(capacity: CapacityConfig) -> Self {
        Self {
            state: Mutex::new(StoreState {
                teams: HashMap::new(),
                capacity,
                student_index: HashMap::new(),
            }),
            path: None,
        }
    }

    // Open the store at `path`, seeding it with `default_capacity` when new
    pub fn open(path: &Path, default_capacity: CapacityConfig) -> Result<Self, ServiceError> {
        let state = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                error!("Failed to read team store {:?}: {:?}", path, e);
                ServiceError::InternalServerError
            })?;
            let document: StoreDocument = serde_json::from_str(&content).map_err(|e| {
                error!("Failed to parse team store {:?}: {:?}", path, e);
                ServiceError::InternalServerError
            })?;
            info!("Loaded {} teams from {:?}", document.teams.len(), path);
            state_from_document(document)?
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| {
                    error!("Failed to create storage directory {:?}: {:?}", dir, e);
                    ServiceError::InternalServerError
                })?;
            }
            info!("Creating team store at {:?}", path);
            StoreState {
                teams: HashMap::new(),
                capacity: default_capacity,
                student_index: HashMap::new(),
            }
        };

        let store = Self {
            state: Mutex::new(state),
            path: Some(path.to_path_buf()),
        };
        {
            let state = store.lock()?;
            store.persist(&state.capacity, state.teams.values())?;
        }
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, ServiceError> {
        self.state.lock().map_err(|e| {
            error!("Team store poisoned: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    // Write the document next to its final path, then swap it in
    fn persist<'a>(
        &self,
        capacity: &'a CapacityConfig,
        teams: impl IntoIterator<Item = &'a TeamAggregate>,
    ) -> Result<(), ServiceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut teams: Vec<&TeamAggregate> = teams.into_iter().collect();
        teams.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let team_count = teams.len();
        let document = StoreDocumentRef { capacity, teams };

        let json = serde_json::to_string_pretty(&document).map_err(|e| {
            error!("Failed to serialize team store: {:?}", e);
            ServiceError::InternalServerError
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| {
            error!("Failed to write team store {:?}: {:?}", tmp_path, e);
            ServiceError::InternalServerError
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            error!("Failed to replace team store {:?}: {:?}", path, e);
            ServiceError::InternalServerError
        })?;

        debug!("Persisted {} teams to {:?}", team_count, path);
        Ok(())
    }
}

fn state_from_document(document: StoreDocument) -> Result<StoreState, ServiceError> {
    let mut state = StoreState {
        teams: HashMap::new(),
        capacity: document.capacity,
        student_index: HashMap::new(),
    };
    for team in document.teams {
        check_index(&state.student_index, &team).map_err(|e| {
            error!("Team store holds conflicting memberships: {}", e);
            ServiceError::InternalServerError
        })?;
        apply_index(&mut state.student_index, None, &team);
        state.teams.insert(team.id.clone(), team);
    }
    Ok(state)
}

// The stored teams with `team` in place of its stored copy, if any
fn with_replaced<'a>(
    teams: &'a HashMap<String, TeamAggregate>,
    team: &'a TeamAggregate,
) -> impl Iterator<Item = &'a TeamAggregate> {
    teams
        .values()
        .filter(move |stored| stored.id != team.id)
        .chain(iter::once(team))
}

// Every active member of `next` must be free or already indexed to it
fn check_index(index: &HashMap<String, String>, next: &TeamAggregate) -> Result<(), ServiceError> {
    for student_id in next.active_members() {
        if let Some(team_id) = index.get(student_id) {
            if *team_id != next.id {
                return Err(ServiceError::StudentAlreadyInTeam(student_id.clone()));
            }
        }
    }
    Ok(())
}

// Move the student index from `previous` membership to `next` membership
fn apply_index(
    index: &mut HashMap<String, String>,
    previous: Option<&TeamAggregate>,
    next: &TeamAggregate,
) {
    if let Some(previous) = previous {
        for student_id in previous.active_members() {
            let still_active = next.is_active() && next.is_member(student_id);
            if !still_active && index.get(student_id) == Some(&next.id) {
                index.remove(student_id);
            }
        }
    }
    for student_id in next.active_members() {
        index.insert(student_id.clone(), next.id.clone());
    }
}

impl TeamStore for DocumentStore {
    fn load_team(&self, team_id: &str) -> Result<Option<TeamAggregate>, ServiceError> {
        Ok(self.lock()?.teams.get(team_id).cloned())
    }

    fn insert_team(
        &self,
        team: &TeamAggregate,
        capacity_version: u64,
    ) -> Result<TeamAggregate, ServiceError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if state.capacity.version != capacity_version {
            return Err(ServiceError::Concurrency(format!(
                "team size changed while creating a team (read version {}, found {})",
                capacity_version, state.capacity.version
            )));
        }
        if state.teams.contains_key(&team.id) {
            error!("Team id collision on insert: {}", team.id);
            return Err(ServiceError::InternalServerError);
        }

        check_index(&state.student_index, team)?;
        self.persist(&state.capacity, with_replaced(&state.teams, team))?;
        apply_index(&mut state.student_index, None, team);
        state.teams.insert(team.id.clone(), team.clone());

        debug!("Inserted team {} at version {}", team.id, team.version);
        Ok(team.clone())
    }

    fn commit_team(&self, team: &TeamAggregate) -> Result<TeamAggregate, ServiceError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let stored = state
            .teams
            .get(&team.id)
            .ok_or_else(|| ServiceError::TeamNotFound(team.id.clone()))?;
        if stored.version != team.version {
            return Err(ServiceError::Concurrency(format!(
                "team {} changed (expected version {}, found {})",
                team.id, team.version, stored.version
            )));
        }

        let mut committed = team.clone();
        committed.version += 1;

        check_index(&state.student_index, &committed)?;
        self.persist(&state.capacity, with_replaced(&state.teams, &committed))?;
        apply_index(&mut state.student_index, Some(stored), &committed);
        state.teams.insert(committed.id.clone(), committed.clone());

        debug!("Committed team {} at version {}", committed.id, committed.version);
        Ok(committed)
    }

    fn active_team_of(&self, student_id: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.lock()?.student_index.get(student_id).cloned())
    }

    fn all_teams(&self) -> Result<Vec<TeamAggregate>, ServiceError> {
        Ok(self.lock()?.teams.values().cloned().collect())
    }

    fn load_capacity(&self) -> Result<CapacityConfig, ServiceError> {
        Ok(self.lock()?.capacity.clone())
    }

    fn commit_capacity_and_resize(&self, config: &CapacityConfig) -> Result<usize, ServiceError> {
        let mut state = self.lock()?;
        if config.version != state.capacity.version + 1 {
            return Err(ServiceError::Concurrency(format!(
                "capacity config changed (stored version {}, proposed {})",
                state.capacity.version, config.version
            )));
        }

        let mut resized = state.teams.clone();
        for team in resized.values_mut() {
            if team.max_size != config.max_size {
                team.max_size = config.max_size;
                team.version += 1;
            }
        }
        self.persist(config, resized.values())?;

        let teams_updated = resized.len();
        state.capacity = config.clone();
        state.teams = resized;

        info!(
            "Capacity config now {} (version {}), applied to {} teams",
            config.max_size, config.version, teams_updated
        );
        Ok(teams_updated)
    }
}
