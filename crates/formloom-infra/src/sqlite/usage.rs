//! SQLite-backed usage limiter.
//!
//! Counts the forms an identity owns and compares against the configured
//! ceiling for its tier (guest or member).

use formloom_core::repository::{FormRepository, UsageLimiter};
use formloom_types::config::GlobalConfig;
use formloom_types::error::RepositoryError;
use formloom_types::identity::{AuthUser, LimitDecision};

use super::form::SqliteFormRepository;
use super::pool::DatabasePool;

/// Usage limiter over the forms table.
pub struct SqliteUsageLimiter {
    repo: SqliteFormRepository,
    guest_limit: u32,
    member_limit: u32,
}

impl SqliteUsageLimiter {
    pub fn new(pool: DatabasePool, config: &GlobalConfig) -> Self {
        Self {
            repo: SqliteFormRepository::new(pool),
            guest_limit: config.guest_form_limit,
            member_limit: config.member_form_limit,
        }
    }
}

impl UsageLimiter for SqliteUsageLimiter {
    async fn check_limit(&self, user: &AuthUser) -> Result<LimitDecision, RepositoryError> {
        let current = self.repo.count_forms_by_owner(&user.user_id).await?;
        let limit = if user.is_guest {
            self.guest_limit
        } else {
            self.member_limit
        };

        Ok(LimitDecision {
            allowed: current < limit,
            current,
            limit,
        })
    }
}
