// cohort-teams/src/models/team.rs
use crate::models::{InviteLedger, ServiceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_TEAM_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "disbanded")]
    Disbanded,
}

/// A team together with its invitation ledger. Every change to either is
/// committed as one write, guarded by `version`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamAggregate {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    pub members: BTreeSet<String>,
    pub max_size: u32,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
    pub version: u64,
    pub invites: InviteLedger,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamView {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    pub members: Vec<String>,
    pub max_size: u32,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
}

impl TeamAggregate {
    // Start a team with the leader as its only member
    pub fn new(name: &str, leader_id: &str, max_size: u32) -> Result<Self, ServiceError> {
        let name = validate_team_name(name)?;
        let mut members = BTreeSet::new();
        members.insert(leader_id.to_string());

        let team = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            leader_id: leader_id.to_string(),
            members,
            max_size,
            status: TeamStatus::Active,
            created_at: Utc::now(),
            version: 0,
            invites: InviteLedger::default(),
        };
        team.verify(Utc::now())?;
        Ok(team)
    }

    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }

    pub fn is_member(&self, student_id: &str) -> bool {
        self.members.contains(student_id)
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Members that count towards the one-active-team rule.
    pub fn active_members(&self) -> impl Iterator<Item = &String> {
        self.members.iter().filter(move |_| self.is_active())
    }

    // Seats taken by members plus outstanding invites
    pub fn committed_seats(&self, now: DateTime<Utc>) -> usize {
        self.size() + self.invites.pending_count(now)
    }

    pub fn add_member(&mut self, student_id: &str) -> Result<(), ServiceError> {
        if self.size() >= self.max_size as usize {
            return Err(ServiceError::TeamFull);
        }
        self.members.insert(student_id.to_string());
        Ok(())
    }

    pub fn remove_member(&mut self, student_id: &str) -> Result<(), ServiceError> {
        if student_id == self.leader_id {
            return Err(ServiceError::LeaderCannotLeave);
        }
        if !self.members.remove(student_id) {
            return Err(ServiceError::NotMember);
        }
        Ok(())
    }

    /// Structural checks run before every commit. Capacity is enforced where
    /// members are added, since an admin may shrink `max_size` below the
    /// current size.
    pub fn verify(&self, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.members.contains(&self.leader_id) {
            log::error!("❌ Team {} lost its leader {} from members", self.id, self.leader_id);
            return Err(ServiceError::InternalServerError);
        }
        if let Some(student_id) = self.invites.duplicate_pending(now) {
            log::error!("❌ Team {} holds duplicate pending invites for {}", self.id, student_id);
            return Err(ServiceError::InternalServerError);
        }
        if let Some(invite) = self.invites.iter().find(|invite| invite.team_id != self.id) {
            log::error!("❌ Invite {} in team {} points at team {}", invite.id, self.id, invite.team_id);
            return Err(ServiceError::InternalServerError);
        }
        if let Some(invite) = self
            .invites
            .pending(now)
            .find(|invite| self.members.contains(&invite.student_id))
        {
            log::error!("❌ Team {} has a pending invite for existing member {}", self.id, invite.student_id);
            return Err(ServiceError::InternalServerError);
        }
        Ok(())
    }

    pub fn view(&self) -> TeamView {
        // Leader first, then the rest in id order
        let mut members = vec![self.leader_id.clone()];
        members.extend(self.members.iter().filter(|id| **id != self.leader_id).cloned());

        TeamView {
            id: self.id.clone(),
            name: self.name.clone(),
            leader_id: self.leader_id.clone(),
            members,
            max_size: self.max_size,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

pub fn validate_team_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("Team name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_TEAM_NAME_LEN {
        return Err(ServiceError::BadRequest(format!(
            "Team name cannot be longer than {} characters",
            MAX_TEAM_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
