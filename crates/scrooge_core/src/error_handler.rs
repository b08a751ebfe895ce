use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level deployment error type.
///
/// Every failure the deployer can hit ends up as one of these variants and
/// is handled exactly once, by the binary's entry point.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of errors for logging and user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad or missing environment value.
    ConfigError,
    /// No usable signer or node.
    EnvironmentError,
    /// Named contract not found or unusable.
    ArtifactError,
    /// Submission or confirmation failed on the node.
    TransactionError,
    /// Local I/O (console writes).
    SystemError,
}

impl ErrorCategory {
    /// Stable snake_case label used as a structured log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "config_error",
            Self::EnvironmentError => "environment_error",
            Self::ArtifactError => "artifact_error",
            Self::TransactionError => "transaction_error",
            Self::SystemError => "system_error",
        }
    }
}

impl DeployError {
    /// Returns the broad error category for routing and display purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::ConfigError,
            Self::Environment(_) => ErrorCategory::EnvironmentError,
            Self::Artifact(_) => ErrorCategory::ArtifactError,
            Self::Transaction(_) => ErrorCategory::TransactionError,
            Self::Io(_) => ErrorCategory::SystemError,
        }
    }

    /// Returns a short hint pointing at the usual fix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("Check TOKEN_* and RPC_* variables: {msg}"),
            Self::Environment(msg) => {
                format!("Is a development node running at RPC_URL with unlocked accounts? {msg}")
            }
            Self::Artifact(msg) => format!("Compile the contracts first: {msg}"),
            Self::Transaction(msg) => format!("The node rejected the deployment: {msg}"),
            Self::Io(e) => format!("Failed to write to the console: {e}"),
        }
    }
}
