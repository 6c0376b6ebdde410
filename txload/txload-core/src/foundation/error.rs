use crate::foundation::LoadPhase;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Transport,
    RemoteRejected,
    NodeIdentityMismatch,
    NoUnspentOutputs,
    InsufficientRootOutput,
    InsufficientFunds,
    StabilizationTimeout,
    ConfigError,
    SerializationError,
    IoError,
    TaskFailed,
    Defect,
    Message,
}

/// Logic bug detected while constructing a transaction.
///
/// Kept apart from [`LoadError`] so callers cannot treat it as an external condition. The
/// orchestrator halts the run when one surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    #[error("value conservation violated: inputs={inputs} outputs={outputs}")]
    ValueMismatch { inputs: u64, outputs: u64 },

    #[error("amount overflow while summing {side}")]
    AmountOverflow { side: &'static str },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("transport error during {operation}: {details}")]
    Transport { operation: String, details: String },

    #[error("node rejected {operation}: status={status}")]
    Rejected { operation: String, status: String },

    #[error("node identity mismatch: expected={expected} actual={actual}")]
    NodeIdentityMismatch { expected: String, actual: String },

    #[error("no unspent outputs for {address}")]
    NoUnspentOutputs { address: String },

    #[error("insufficient funds in the largest output: available={available} required={required}")]
    InsufficientRootOutput { available: u64, required: u64 },

    #[error("insufficient funds: available={available} required={required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("balances failed to stabilise after {attempts} attempts; pending={pending:?}")]
    StabilizationTimeout { attempts: u32, pending: Vec<String> },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("io error during {operation}: {details}")]
    Io { operation: String, details: String },

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("defect: {0}")]
    Defect(#[from] Defect),

    #[error("{phase} failed on node {participant}: {source}")]
    Phase {
        phase: LoadPhase,
        participant: String,
        #[source]
        source: Box<LoadError>,
    },

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;

impl LoadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoadError::Transport { .. } => ErrorCode::Transport,
            LoadError::Rejected { .. } => ErrorCode::RemoteRejected,
            LoadError::NodeIdentityMismatch { .. } => ErrorCode::NodeIdentityMismatch,
            LoadError::NoUnspentOutputs { .. } => ErrorCode::NoUnspentOutputs,
            LoadError::InsufficientRootOutput { .. } => ErrorCode::InsufficientRootOutput,
            LoadError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            LoadError::StabilizationTimeout { .. } => ErrorCode::StabilizationTimeout,
            LoadError::ConfigError(_) => ErrorCode::ConfigError,
            LoadError::SerializationError { .. } => ErrorCode::SerializationError,
            LoadError::Io { .. } => ErrorCode::IoError,
            LoadError::TaskFailed(_) => ErrorCode::TaskFailed,
            LoadError::Defect(_) => ErrorCode::Defect,
            LoadError::Phase { source, .. } => source.code(),
            LoadError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn transport(operation: impl Into<String>, details: impl ToString) -> Self {
        LoadError::Transport { operation: operation.into(), details: details.to_string() }
    }

    pub fn rejected(operation: impl Into<String>, status: impl Into<String>) -> Self {
        LoadError::Rejected { operation: operation.into(), status: status.into() }
    }

    /// Tags the error with the phase and participant it escaped from.
    pub fn in_phase(self, phase: LoadPhase, participant: impl Into<String>) -> Self {
        LoadError::Phase { phase, participant: participant.into(), source: Box::new(self) }
    }

    /// Remote business failure (explicit failure status), as opposed to a transport failure.
    pub fn is_rejection(&self) -> bool {
        match self {
            LoadError::Rejected { .. } => true,
            LoadError::Phase { source, .. } => source.is_rejection(),
            _ => false,
        }
    }

    pub fn defect(&self) -> Option<&Defect> {
        match self {
            LoadError::Defect(defect) => Some(defect),
            LoadError::Phase { source, .. } => source.defect(),
            _ => None,
        }
    }

    pub fn is_defect(&self) -> bool {
        self.defect().is_some()
    }

    /// Phase and participant of the outermost context, if any.
    pub fn origin(&self) -> Option<(LoadPhase, &str)> {
        match self {
            LoadError::Phase { phase, participant, .. } => Some((*phase, participant.as_str())),
            _ => None,
        }
    }
}

#[macro_export]
macro_rules! serde_err {
    ($fmt:expr, $err:expr) => {
        $crate::foundation::LoadError::SerializationError { format: $fmt.into(), details: $err.to_string() }
    };
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        let operation = err.url().map(|url| url.path().rsplit('/').next().unwrap_or_default().to_string()).unwrap_or_default();
        LoadError::Transport { operation: format!("http {operation}"), details: err.to_string() }
    }
}

impl From<figment::Error> for LoadError {
    fn from(err: figment::Error) -> Self {
        LoadError::ConfigError(format!("config extraction failed: {err}"))
    }
}

impl From<tokio::task::JoinError> for LoadError {
    fn from(err: tokio::task::JoinError) -> Self {
        LoadError::TaskFailed(err.to_string())
    }
}
