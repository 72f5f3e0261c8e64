//! Decision outcomes and decision records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Three-way result of a check
///
/// `Unavailable` is distinct from `Denied` so that a caller can tell "not
/// permitted" apart from "could not decide". Both refuse access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOutcome {
    Granted,
    Denied,
    Unavailable,
}

impl AccessOutcome {
    /// Map a check result onto an outcome
    ///
    /// Caller errors (`InvalidInput`, `Config`) are denials; only store and
    /// identity failures are `Unavailable`.
    pub fn from_result(result: &Result<bool>) -> Self {
        match result {
            Ok(true) => AccessOutcome::Granted,
            Ok(false) => AccessOutcome::Denied,
            Err(e) if e.is_unavailable() => AccessOutcome::Unavailable,
            Err(_) => AccessOutcome::Denied,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted)
    }
}

/// Record of a single decision, as returned over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub decision_id: String,

    pub allowed: bool,

    pub outcome: AccessOutcome,

    /// User the decision was made for, if one was identified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Normalized requested names
    pub permissions: Vec<String>,

    /// Reason for a non-grant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Evaluation time in microseconds
    pub evaluation_time_us: u64,
}

impl Decision {
    /// Build a decision from a check result
    pub fn new(
        user_id: Option<String>,
        permissions: Vec<String>,
        result: &Result<bool>,
        evaluation_time_us: u64,
    ) -> Self {
        let outcome = AccessOutcome::from_result(result);
        let reason = match result {
            Ok(true) => None,
            Ok(false) => Some("no matching permission".to_string()),
            Err(e) => Some(e.to_string()),
        };

        Self {
            decision_id: Uuid::new_v4().to_string(),
            allowed: outcome.is_granted(),
            outcome,
            user_id,
            permissions,
            reason,
            timestamp: Utc::now(),
            evaluation_time_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(AccessOutcome::from_result(&Ok(true)), AccessOutcome::Granted);
        assert_eq!(AccessOutcome::from_result(&Ok(false)), AccessOutcome::Denied);
        assert_eq!(
            AccessOutcome::from_result(&Err(AuthError::StoreUnavailable("down".into()))),
            AccessOutcome::Unavailable
        );
        assert_eq!(
            AccessOutcome::from_result(&Err(AuthError::InvalidInput("bad".into()))),
            AccessOutcome::Denied
        );
    }

    #[test]
    fn test_decision_record() {
        let decision = Decision::new(Some("u1".into()), vec!["a".into()], &Ok(true), 12);
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
        assert_eq!(decision.decision_id.len(), 36);

        let denied = Decision::new(None, vec![], &Ok(false), 0);
        assert_eq!(denied.outcome, AccessOutcome::Denied);
        assert!(denied.reason.is_some());
    }
}
