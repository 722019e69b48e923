//! Core value objects: job states, scan capabilities, transition records.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a scan job.
///
/// The serialized tokens are the client-observable status contract and must
/// stay exactly `CREATED`, `APPROVED`, `STARTED`, `ENDED`, `CANCELED`,
/// `FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Job exists but has not been approved yet
    Created,
    /// Job is approved and waiting for the scheduler to start it
    Approved,
    /// An engine invocation is in flight
    Started,
    /// Job finished successfully
    Ended,
    /// Job was canceled before completion
    Canceled,
    /// Engine execution failed
    Failed,
}

impl JobState {
    /// Returns the set of valid target states from the current state.
    ///
    /// ```text
    /// Created ──► Approved ──► Started ──► Ended
    ///   │            │           │
    ///   └────────────┴───────────┴──► Canceled / Failed
    /// ```
    pub fn valid_transitions(&self) -> &[JobState] {
        match self {
            Self::Created => &[Self::Approved, Self::Canceled, Self::Failed],
            Self::Approved => &[Self::Started, Self::Canceled, Self::Failed],
            Self::Started => &[Self::Ended, Self::Failed, Self::Canceled],
            Self::Ended | Self::Canceled | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `target` is allowed from the current state.
    pub fn can_transition_to(&self, target: &JobState) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Whether this state is terminal. No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Canceled | Self::Failed)
    }

    /// The literal status token exposed to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Started => "STARTED",
            Self::Ended => "ENDED",
            Self::Canceled => "CANCELED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an invalid state transition is attempted.
#[derive(Debug, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct JobTransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// Recorded state transition for a job (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTransition {
    pub from: JobState,
    pub to: JobState,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Human-readable reason or context for the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Category of scan an engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanCapability {
    /// Static source-code analysis
    Code,
    /// Web-application scanning
    Web,
    /// Infrastructure scanning
    Infra,
}

impl ScanCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Web => "web",
            Self::Infra => "infra",
        }
    }
}

impl std::fmt::Display for ScanCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanCapability {
    type Err = UnknownCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "web" => Ok(Self::Web),
            "infra" => Ok(Self::Infra),
            other => Err(UnknownCapabilityError(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown capability token.
#[derive(Debug, thiserror::Error)]
#[error("Unknown scan capability: {0}")]
pub struct UnknownCapabilityError(pub String);

/// Classification of an engine failure, stored instead of raw engine detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The engine ran but reported a failure
    Engine,
    /// The engine rejected its configuration
    Configuration,
    /// An I/O problem prevented execution
    Io,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Configuration => write!(f, "configuration"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Outcome of a single engine invocation, recorded in the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "failure", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed(FailureKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tokens_are_exact() {
        assert_eq!(JobState::Created.to_string(), "CREATED");
        assert_eq!(JobState::Approved.to_string(), "APPROVED");
        assert_eq!(JobState::Started.to_string(), "STARTED");
        assert_eq!(JobState::Ended.to_string(), "ENDED");
        assert_eq!(JobState::Canceled.to_string(), "CANCELED");
        assert_eq!(JobState::Failed.to_string(), "FAILED");
    }

    #[test]
    fn state_tokens_roundtrip_through_serde() {
        for state in [
            JobState::Created,
            JobState::Approved,
            JobState::Started,
            JobState::Ended,
            JobState::Canceled,
            JobState::Failed,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
            let back: JobState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
    }

    #[test]
    fn valid_transitions_follow_the_state_machine() {
        assert!(JobState::Created.can_transition_to(&JobState::Approved));
        assert!(JobState::Created.can_transition_to(&JobState::Canceled));
        assert!(JobState::Approved.can_transition_to(&JobState::Started));
        assert!(JobState::Approved.can_transition_to(&JobState::Canceled));
        assert!(JobState::Started.can_transition_to(&JobState::Ended));
        assert!(JobState::Started.can_transition_to(&JobState::Failed));
        assert!(JobState::Started.can_transition_to(&JobState::Canceled));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        assert!(!JobState::Created.can_transition_to(&JobState::Started));
        assert!(!JobState::Created.can_transition_to(&JobState::Ended));
        assert!(!JobState::Approved.can_transition_to(&JobState::Ended));
        assert!(!JobState::Ended.can_transition_to(&JobState::Started));
        assert!(!JobState::Canceled.can_transition_to(&JobState::Approved));
        assert!(!JobState::Failed.can_transition_to(&JobState::Started));
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Ended.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Created.is_terminal());
        assert!(!JobState::Approved.is_terminal());
        assert!(!JobState::Started.is_terminal());
    }

    #[test]
    fn capability_parses_known_tokens() {
        assert_eq!("code".parse::<ScanCapability>().unwrap(), ScanCapability::Code);
        assert_eq!("web".parse::<ScanCapability>().unwrap(), ScanCapability::Web);
        assert_eq!("infra".parse::<ScanCapability>().unwrap(), ScanCapability::Infra);
        assert!("network".parse::<ScanCapability>().is_err());
    }
}
