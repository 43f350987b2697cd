// cohort-teams/src/models/invitations.rs
use crate::models::ServiceError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// Status for team invitations. Every status except Pending is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "expired")]
    Expired,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Rejected => "rejected",
            InviteStatus::Cancelled => "cancelled",
            InviteStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != InviteStatus::Pending
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// What an invitee can do with a pending invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteAction {
    #[serde(rename = "accept")]
    Accept,
    #[serde(rename = "reject")]
    Reject,
}

// Team invitation model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Invite {
    pub id: String,
    pub team_id: String,
    pub student_id: String,
    pub invited_by: String,
    pub status: InviteStatus,
    pub invited_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
}

// Request to invite a student to a team
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateInvitationRequest {
    pub student_id: String,
}

// Request to accept or reject an invitation
#[derive(Serialize, Deserialize, Debug)]
pub struct RespondInvitationRequest {
    pub action: InviteAction,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InviteView {
    pub id: String,
    pub team_id: String,
    pub student_id: String,
    pub invited_by: String,
    pub status: InviteStatus,
    pub invited_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Invite {
    pub fn new(
        team_id: &str,
        student_id: &str,
        invited_by: &str,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            student_id: student_id.to_string(),
            invited_by: invited_by.to_string(),
            status: InviteStatus::Pending,
            invited_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            responded_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }

    /// Status as observed at `now`: a pending invite past its expiry reads as
    /// expired even before the ledger has recorded it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.status == InviteStatus::Pending && self.is_expired(now) {
            InviteStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == InviteStatus::Pending
    }

    // Move a pending invite into a terminal status
    pub fn resolve(&mut self, to: InviteStatus, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let current = self.effective_status(now);
        if current.is_terminal() {
            return Err(ServiceError::InviteNotPending(current));
        }
        if !to.is_terminal() {
            return Err(ServiceError::BadRequest(
                "An invitation cannot be moved back to pending".to_string(),
            ));
        }
        self.status = to;
        self.responded_at = Some(now);
        Ok(())
    }

    pub fn view(&self, now: DateTime<Utc>) -> InviteView {
        InviteView {
            id: self.id.clone(),
            team_id: self.team_id.clone(),
            student_id: self.student_id.clone(),
            invited_by: self.invited_by.clone(),
            status: self.effective_status(now),
            invited_at: self.invited_at,
            expires_at: self.expires_at,
        }
    }
}

/// All invitations ever issued by one team, in issue order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct InviteLedger {
    invites: Vec<Invite>,
}

impl InviteLedger {
    pub fn iter(&self) -> impl Iterator<Item = &Invite> {
        self.invites.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.invites.len()
    }

    pub fn find(&self, invite_id: &str) -> Option<&Invite> {
        self.invites.iter().find(|invite| invite.id == invite_id)
    }

    pub fn find_mut(&mut self, invite_id: &str) -> Option<&mut Invite> {
        self.invites.iter_mut().find(|invite| invite.id == invite_id)
    }

    pub fn pending_for(&self, student_id: &str, now: DateTime<Utc>) -> Option<&Invite> {
        self.invites
            .iter()
            .find(|invite| invite.student_id == student_id && invite.is_pending(now))
    }

    pub fn pending(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Invite> {
        self.invites.iter().filter(move |invite| invite.is_pending(now))
    }

    pub fn pending_count(&self, now: DateTime<Utc>) -> usize {
        self.pending(now).count()
    }

    // Append a new pending invite; one pending invite per student at most
    pub fn issue(&mut self, invite: Invite, now: DateTime<Utc>) -> Result<&Invite, ServiceError> {
        if self.pending_for(&invite.student_id, now).is_some() {
            return Err(ServiceError::AlreadyInvited(invite.student_id));
        }
        self.invites.push(invite);
        Ok(&self.invites[self.invites.len() - 1])
    }

    // Record expiry on every pending invite whose deadline has passed
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for invite in &mut self.invites {
            if invite.status == InviteStatus::Pending && invite.is_expired(now) {
                invite.status = InviteStatus::Expired;
                expired += 1;
            }
        }
        expired
    }

    pub fn cancel_pending(&mut self, now: DateTime<Utc>) -> usize {
        let mut cancelled = 0;
        for invite in &mut self.invites {
            if invite.is_pending(now) {
                invite.status = InviteStatus::Cancelled;
                invite.responded_at = Some(now);
                cancelled += 1;
            }
        }
        cancelled
    }

    // First student holding more than one pending invite, if any
    pub fn duplicate_pending(&self, now: DateTime<Utc>) -> Option<&str> {
        let mut seen = HashSet::new();
        self.pending(now)
            .find(|invite| !seen.insert(invite.student_id.as_str()))
            .map(|invite| invite.student_id.as_str())
    }
}
