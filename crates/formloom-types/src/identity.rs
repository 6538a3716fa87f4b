//! Identities supplied by the authentication layer and the usage limiter
//! contract.

use serde::{Deserialize, Serialize};

/// The authenticated (or guest) caller for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub is_guest: bool,
}

impl AuthUser {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_guest: false,
        }
    }

    pub fn guest(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_guest: true,
        }
    }
}

/// Result of a usage-limit check, evaluated before any orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitDecision {
    pub allowed: bool,
    pub current: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_flag() {
        assert!(AuthUser::guest("g-1").is_guest);
        assert!(!AuthUser::member("u-1").is_guest);
    }

    #[test]
    fn limit_decision_roundtrip() {
        let decision = LimitDecision {
            allowed: false,
            current: 10,
            limit: 10,
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"allowed\":false"));
        let parsed: LimitDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decision);
    }
}
