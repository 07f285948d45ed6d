use crate::ranges::{AbgParameter, Bounds};

/// One parameter that fell outside its validation bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundViolation {
    pub parameter: AbgParameter,
    pub value: f64,
    pub bounds: Bounds,
}

impl std::fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.parameter.label();
        if !self.value.is_finite() {
            return write!(f, "{name} must be a finite number");
        }
        if self.value < self.bounds.min {
            write!(f, "{name} must be ≥ {} (got {})", self.bounds.min, self.value)
        } else {
            write!(f, "{name} must be ≤ {} (got {})", self.bounds.max, self.value)
        }
    }
}

/// Every bound violation found in a submitted panel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid ABG values: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<BoundViolation>,
}

impl ValidationError {
    pub fn violation_for(&self, parameter: AbgParameter) -> Option<&BoundViolation> {
        self.violations.iter().find(|v| v.parameter == parameter)
    }
}

fn join_violations(violations: &[BoundViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of the remote inference service.
///
/// The orchestrator never propagates these; they are turned into a fallback result plus a
/// warning string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("inference service timed out")]
    Timeout,
    #[error("inference service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("inference service error: {0}")]
    Service(String),
}

/// Failures of the persistent history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create history directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read history file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write history file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to lock history file: {0}")]
    FileLock(std::io::Error),
    #[error("failed to serialize history: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize history: {0}")]
    Deserialization(serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AbgError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("you must be signed in to perform an online analysis")]
    AuthRequired,
    #[error("history store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AbgResult<T> = std::result::Result<T, AbgError>;
