// cohort-teams/src/models/mod.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub mod capacity;
pub use capacity::*;

pub mod invitations;
pub use invitations::*;

pub mod team;
pub use team::*;

// Directory roles as provided by the portal's user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "student")]
    Student,
    #[serde(rename = "alumni")]
    Alumni,
    #[serde(rename = "admin")]
    Admin,
}

// JWT claims issued by the portal's auth service
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: usize,  // Expiration time
    pub iat: usize,  // Issued at
}

/// Coarse classification of a [`ServiceError`], used for HTTP mapping and
/// retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Concurrency,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::Internal => "internal",
        }
    }
}

// Custom error types
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "Unauthorized")]
    Unauthorized,
    #[display(fmt = "Forbidden: You don't have permission to perform this action")]
    Forbidden,
    #[display(fmt = "Only the team leader can do this")]
    NotLeader,
    #[display(fmt = "Team not found: {}", _0)]
    TeamNotFound(String),
    #[display(fmt = "Invitation not found: {}", _0)]
    InviteNotFound(String),
    #[display(fmt = "Student not found: {}", _0)]
    StudentNotFound(String),
    #[display(fmt = "Team is full")]
    TeamFull,
    #[display(fmt = "You are already in an active team")]
    AlreadyInTeam,
    #[display(fmt = "Student {} is already in an active team", _0)]
    StudentAlreadyInTeam(String),
    #[display(fmt = "Student {} already has a pending invitation to this team", _0)]
    AlreadyInvited(String),
    #[display(fmt = "Invitation is already {}", _0)]
    InviteNotPending(InviteStatus),
    #[display(fmt = "Team has been disbanded")]
    TeamNotActive,
    #[display(fmt = "The team leader cannot leave the team; disband it instead")]
    LeaderCannotLeave,
    #[display(fmt = "You are not a member of this team")]
    NotMember,
    #[display(fmt = "The team is busy, please try again: {}", _0)]
    Concurrency(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::BadRequest(_) => ErrorKind::Validation,
            ServiceError::Unauthorized | ServiceError::Forbidden | ServiceError::NotLeader => {
                ErrorKind::Authorization
            }
            ServiceError::TeamNotFound(_)
            | ServiceError::InviteNotFound(_)
            | ServiceError::StudentNotFound(_) => ErrorKind::NotFound,
            ServiceError::TeamFull
            | ServiceError::AlreadyInTeam
            | ServiceError::StudentAlreadyInTeam(_)
            | ServiceError::AlreadyInvited(_)
            | ServiceError::InviteNotPending(_)
            | ServiceError::TeamNotActive
            | ServiceError::LeaderCannotLeave
            | ServiceError::NotMember => ErrorKind::Conflict,
            ServiceError::Concurrency(_) => ErrorKind::Concurrency,
            ServiceError::InternalServerError => ErrorKind::Internal,
        }
    }

    // Only lost races are worth retrying; everything else is terminal for the call
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden | ServiceError::NotLeader => StatusCode::FORBIDDEN,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Authorization => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Concurrency => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind().as_str(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        }))
    }
}
