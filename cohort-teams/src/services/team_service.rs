// cohort-teams/src/services/team_service.rs
//! Team formation and invitations.
//!
//! Every mutation of an existing team runs the same way: take the team's
//! lease, load the aggregate, validate and change it, then commit it with a
//! version check. Lease timeouts and version mismatches are retried with
//! backoff; anything else is returned to the caller untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::config::AppConfig;
use crate::models::{
    validate_team_name, CapacityConfig, Invite, InviteAction, InviteStatus, InviteView,
    ServiceError, SetCapacityResponse, TeamAggregate, TeamStatus, TeamView, UserRole,
};
use crate::services::{CapacityPolicy, MembershipIndex};
use crate::utils::{DirectoryEntry, RetryPolicy, StudentDirectory, TeamLockRegistry, TeamStore};

#[derive(Debug, Clone)]
pub struct TeamSettings {
    pub invite_ttl: Option<chrono::Duration>,
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            invite_ttl: Some(chrono::Duration::days(7)),
            lock_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for TeamSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            invite_ttl: config.invite_ttl,
            lock_timeout: config.lock_timeout,
            retry: config.retry.clone(),
        }
    }
}

pub struct TeamService {
    store: Arc<dyn TeamStore>,
    directory: Arc<dyn StudentDirectory>,
    locks: TeamLockRegistry,
    membership: MembershipIndex,
    capacity: CapacityPolicy,
    settings: TeamSettings,
}

impl TeamService {
    pub fn new(
        store: Arc<dyn TeamStore>,
        directory: Arc<dyn StudentDirectory>,
        settings: TeamSettings,
    ) -> Self {
        Self {
            membership: MembershipIndex::new(store.clone()),
            capacity: CapacityPolicy::new(store.clone(), settings.retry.clone()),
            store,
            directory,
            locks: TeamLockRegistry::new(),
            settings,
        }
    }

    // ----- team lifecycle -----

    pub fn create_team(&self, requester_id: &str, name: &str) -> Result<TeamView, ServiceError> {
        let name = validate_team_name(name)?;
        self.require_active_student(requester_id)?;

        info!("📝 Creating team {:?} for student: {}", name, requester_id);

        let team = self.settings.retry.run("create team", || {
            if self.membership.is_active_member_of(requester_id)?.is_some() {
                return Err(ServiceError::AlreadyInTeam);
            }
            let capacity = self.capacity.config()?;
            let team = TeamAggregate::new(&name, requester_id, capacity.max_size)?;
            // The store's unique index settles a race with a concurrent join,
            // and a resize since `capacity` was read sends us round again
            self.store.insert_team(&team, capacity.version).map_err(|e| match e {
                ServiceError::StudentAlreadyInTeam(_) => ServiceError::AlreadyInTeam,
                other => other,
            })
        })?;

        info!("✅ Team created: {} (max size {})", team.id, team.max_size);
        Ok(team.view())
    }

    pub fn leave_team(&self, team_id: &str, student_id: &str) -> Result<TeamView, ServiceError> {
        info!("🚪 Student {} leaving team {}", student_id, team_id);

        let ((), team) = self.mutate_team("leave team", team_id, student_id, |team, _now| {
            if !team.is_active() {
                return Err(ServiceError::TeamNotActive);
            }
            team.remove_member(student_id)
        })?;

        info!("✅ Student {} left team {}", student_id, team_id);
        Ok(team.view())
    }

    pub fn disband_team(&self, team_id: &str, requester_id: &str) -> Result<TeamView, ServiceError> {
        info!("🗑️ Disbanding team {} at the request of {}", team_id, requester_id);

        let (cancelled, team) = self.mutate_team("disband team", team_id, requester_id, |team, now| {
            if team.leader_id != requester_id {
                return Err(ServiceError::NotLeader);
            }
            if !team.is_active() {
                return Err(ServiceError::TeamNotActive);
            }
            team.status = TeamStatus::Disbanded;
            Ok(team.invites.cancel_pending(now))
        })?;

        info!("✅ Team {} disbanded, {} pending invitations cancelled", team_id, cancelled);
        Ok(team.view())
    }

    // ----- invitations -----

    pub fn invite_member(
        &self,
        team_id: &str,
        requester_id: &str,
        student_id: &str,
    ) -> Result<InviteView, ServiceError> {
        info!("📧 Inviting student {} to team {}", student_id, team_id);

        let invitee = self.find_user(student_id)?;
        if !invitee.is_active_student() {
            return Err(ServiceError::BadRequest(format!(
                "{} is not an active student",
                student_id
            )));
        }

        let (invite, _) = self.mutate_team("invite member", team_id, requester_id, |team, now| {
            if team.leader_id != requester_id {
                return Err(ServiceError::NotLeader);
            }
            if !team.is_active() {
                return Err(ServiceError::TeamNotActive);
            }
            if team.is_member(student_id) || self.membership.is_active_member_of(student_id)?.is_some() {
                return Err(ServiceError::StudentAlreadyInTeam(student_id.to_string()));
            }
            if team.invites.pending_for(student_id, now).is_some() {
                return Err(ServiceError::AlreadyInvited(student_id.to_string()));
            }
            // Outstanding invites hold a seat until they resolve
            if team.committed_seats(now) >= team.max_size as usize {
                return Err(ServiceError::TeamFull);
            }

            let invite = Invite::new(&team.id, student_id, requester_id, self.settings.invite_ttl, now);
            Ok(team.invites.issue(invite, now)?.view(now))
        })?;

        info!("✅ Invitation created: {}", invite.id);
        Ok(invite)
    }

    pub fn respond_to_invite(
        &self,
        team_id: &str,
        invite_id: &str,
        student_id: &str,
        action: InviteAction,
    ) -> Result<TeamView, ServiceError> {
        info!("🔄 Student {} responding to invitation {}: {:?}", student_id, invite_id, action);

        let ((), team) = self.mutate_team("respond to invite", team_id, student_id, |team, now| {
            let invite = team
                .invites
                .find(invite_id)
                .ok_or_else(|| ServiceError::InviteNotFound(invite_id.to_string()))?;
            if invite.student_id != student_id {
                return Err(ServiceError::Forbidden);
            }
            let status = invite.effective_status(now);
            if status.is_terminal() {
                return Err(ServiceError::InviteNotPending(status));
            }

            let outcome = match action {
                InviteAction::Reject => InviteStatus::Rejected,
                InviteAction::Accept => {
                    if !team.is_active() {
                        return Err(ServiceError::TeamNotActive);
                    }
                    if let Some(current) = self.membership.is_active_member_of(student_id)? {
                        if current.id != team.id {
                            return Err(ServiceError::StudentAlreadyInTeam(student_id.to_string()));
                        }
                    }
                    // Seats may have been taken since the invite went out
                    team.add_member(student_id)?;
                    InviteStatus::Accepted
                }
            };

            team.invites
                .find_mut(invite_id)
                .ok_or_else(|| ServiceError::InviteNotFound(invite_id.to_string()))?
                .resolve(outcome, now)
        })?;

        info!("✅ Invitation {} resolved, team {} now has {} members", invite_id, team.id, team.size());
        Ok(team.view())
    }

    pub fn revoke_invite(
        &self,
        team_id: &str,
        invite_id: &str,
        requester_id: &str,
    ) -> Result<InviteView, ServiceError> {
        info!("🗑️ Revoking invitation {} in team {}", invite_id, team_id);

        let (invite, _) = self.mutate_team("revoke invite", team_id, requester_id, |team, now| {
            if team.leader_id != requester_id {
                return Err(ServiceError::NotLeader);
            }
            let invite = team
                .invites
                .find_mut(invite_id)
                .ok_or_else(|| ServiceError::InviteNotFound(invite_id.to_string()))?;
            invite.resolve(InviteStatus::Cancelled, now)?;
            Ok(invite.view(now))
        })?;

        info!("✅ Invitation {} revoked", invite_id);
        Ok(invite)
    }

    pub fn list_pending_invites_for(&self, student_id: &str) -> Result<Vec<InviteView>, ServiceError> {
        debug!("📋 Fetching pending invitations for student: {}", student_id);

        let now = Utc::now();
        let mut invites: Vec<InviteView> = self
            .store
            .all_teams()?
            .iter()
            .filter(|team| team.is_active())
            .flat_map(|team| team.invites.pending(now))
            .filter(|invite| invite.student_id == student_id)
            .map(|invite| invite.view(now))
            .collect();
        invites.sort_by(|a, b| a.invited_at.cmp(&b.invited_at).then_with(|| a.id.cmp(&b.id)));

        debug!("Found {} pending invitations for student {}", invites.len(), student_id);
        Ok(invites)
    }

    pub fn list_team_invites(&self, team_id: &str, requester_id: &str) -> Result<Vec<InviteView>, ServiceError> {
        let team = self.load_team(team_id)?;
        if !team.is_member(requester_id) {
            return Err(ServiceError::Forbidden);
        }
        let now = Utc::now();
        Ok(team.invites.iter().map(|invite| invite.view(now)).collect())
    }

    // ----- reads -----

    pub fn get_team(&self, team_id: &str) -> Result<TeamView, ServiceError> {
        Ok(self.load_team(team_id)?.view())
    }

    pub fn team_for_student(&self, student_id: &str) -> Result<Option<TeamView>, ServiceError> {
        Ok(self
            .membership
            .is_active_member_of(student_id)?
            .map(|team| team.view()))
    }

    // ----- capacity -----

    pub fn capacity(&self) -> Result<CapacityConfig, ServiceError> {
        self.capacity.config()
    }

    pub fn set_global_capacity(
        &self,
        requester_id: &str,
        new_size: u32,
    ) -> Result<SetCapacityResponse, ServiceError> {
        let requester = self.find_user(requester_id)?;
        if requester.role != UserRole::Admin || !requester.active {
            error!("❌ User {} is not allowed to change team capacity", requester_id);
            return Err(ServiceError::Forbidden);
        }

        info!(
            "📏 Admin {} changing team size from {} to {}",
            requester_id,
            self.capacity.current()?,
            new_size
        );
        let teams_updated = self.capacity.apply_to_all(new_size)?;

        Ok(SetCapacityResponse {
            max_size: new_size,
            teams_updated,
        })
    }

    // ----- helpers -----

    fn load_team(&self, team_id: &str) -> Result<TeamAggregate, ServiceError> {
        self.store
            .load_team(team_id)?
            .ok_or_else(|| ServiceError::TeamNotFound(team_id.to_string()))
    }

    fn find_user(&self, user_id: &str) -> Result<DirectoryEntry, ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::BadRequest("User id cannot be empty".to_string()));
        }
        self.directory
            .find_user(user_id)?
            .ok_or_else(|| ServiceError::StudentNotFound(user_id.to_string()))
    }

    fn require_active_student(&self, user_id: &str) -> Result<DirectoryEntry, ServiceError> {
        let user = self.find_user(user_id)?;
        if !user.is_active_student() {
            error!("❌ User {} is not an active student", user_id);
            return Err(ServiceError::Forbidden);
        }
        Ok(user)
    }

    /// Lease, load, change, verify and commit one team. `change` sees the
    /// aggregate with stale invites already marked expired; if it fails,
    /// nothing is written.
    fn mutate_team<T, F>(
        &self,
        op_name: &str,
        team_id: &str,
        holder: &str,
        mut change: F,
    ) -> Result<(T, TeamAggregate), ServiceError>
    where
        F: FnMut(&mut TeamAggregate, DateTime<Utc>) -> Result<T, ServiceError>,
    {
        self.settings.retry.run(op_name, || {
            let _lease = self.locks.acquire(team_id, holder, self.settings.lock_timeout)?;
            let mut team = self.load_team(team_id)?;
            let now = Utc::now();

            team.invites.expire_stale(now);
            let outcome = change(&mut team, now)?;
            team.verify(now)?;

            let committed = self.store.commit_team(&team)?;
            Ok((outcome, committed))
        })
    }
}
