//! Usage limiter port.
//!
//! Checked before any orchestration begins; a rejected caller produces no
//! partial state.

use formloom_types::error::RepositoryError;
use formloom_types::identity::{AuthUser, LimitDecision};

/// Evaluates whether a caller may create more forms.
pub trait UsageLimiter: Send + Sync {
    fn check_limit(
        &self,
        user: &AuthUser,
    ) -> impl Future<Output = Result<LimitDecision, RepositoryError>> + Send;
}
