// cohort-teams/src/models/capacity.rs
use crate::models::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_TEAM_SIZE: u32 = 2;
pub const MAX_TEAM_SIZE: u32 = 20;

/// The admin-configurable default team size. Each write bumps `version`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapacityConfig {
    pub max_size: u32,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

// Request body for admin capacity changes
#[derive(Serialize, Deserialize, Debug)]
pub struct SetCapacityRequest {
    pub max_size: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SetCapacityResponse {
    pub max_size: u32,
    pub teams_updated: usize,
}

impl CapacityConfig {
    pub fn new(max_size: u32) -> Result<Self, ServiceError> {
        validate_team_size(max_size)?;
        Ok(Self {
            max_size,
            version: 0,
            updated_at: Utc::now(),
        })
    }

    // Next revision of this config with a new size
    pub fn revise(&self, max_size: u32) -> Result<Self, ServiceError> {
        validate_team_size(max_size)?;
        Ok(Self {
            max_size,
            version: self.version + 1,
            updated_at: Utc::now(),
        })
    }
}

pub fn validate_team_size(max_size: u32) -> Result<(), ServiceError> {
    if !(MIN_TEAM_SIZE..=MAX_TEAM_SIZE).contains(&max_size) {
        return Err(ServiceError::BadRequest(format!(
            "Team size must be between {} and {}, got {}",
            MIN_TEAM_SIZE, MAX_TEAM_SIZE, max_size
        )));
    }
    Ok(())
}
