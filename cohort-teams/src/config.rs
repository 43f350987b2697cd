// cohort-teams/src/config.rs
use crate::models::{validate_team_size, ServiceError};
use crate::utils::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDRESS: &str = "127.0.0.1:9090";
const DEFAULT_STORAGE_PATH: &str = "./storage";
const DEFAULT_JWT_SECRET: &str = "cohort_teams_dev_secret";

// Runtime settings, read from the environment (and `.env` via dotenv)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub storage_path: PathBuf,
    pub jwt_secret: String,
    pub default_team_size: u32,
    /// `None` when invitations never expire.
    pub invite_ttl: Option<chrono::Duration>,
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
    pub directory_file: PathBuf,
    pub allowed_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_path =
            PathBuf::from(lookup("STORAGE_PATH").unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string()));

        let default_team_size = parse_or(&lookup, "DEFAULT_TEAM_SIZE", 4u32)?;
        validate_team_size(default_team_size)?;

        let invite_ttl_days = parse_or(&lookup, "INVITE_TTL_DAYS", 7i64)?;
        if invite_ttl_days < 0 {
            return Err(ServiceError::BadRequest(
                "INVITE_TTL_DAYS cannot be negative".to_string(),
            ));
        }
        let invite_ttl = (invite_ttl_days > 0).then(|| chrono::Duration::days(invite_ttl_days));

        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "TEAM_RETRY_ATTEMPTS", 5u32)?.max(1),
            initial_backoff: Duration::from_millis(parse_or(&lookup, "TEAM_RETRY_BACKOFF_MS", 25u64)?),
            ..RetryPolicy::default()
        };

        let directory_file = lookup("STUDENT_DIRECTORY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| storage_path.join("students.json"));

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            default_team_size,
            invite_ttl,
            lock_timeout: Duration::from_millis(parse_or(&lookup, "TEAM_LOCK_TIMEOUT_MS", 2000u64)?),
            retry,
            directory_file,
            allowed_origin: lookup("CORS_ALLOWED_ORIGIN"),
            storage_path,
        })
    }

    pub fn store_file(&self) -> PathBuf {
        self.storage_path.join("teams.json")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ServiceError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ServiceError::BadRequest(format!("Invalid value for {}: {:?}", key, raw))
        }),
        None => Ok(default),
    }
}
