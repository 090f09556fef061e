use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("remote connection failed: {0}")]
    Connectivity(String),

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("deployment failed: {0}")]
    Deployment(String),

    #[error("proxy configuration rejected: {0}")]
    Configuration(String),

    #[error("interrupted")]
    Interrupted,

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Process exit status for this failure class.
    ///
    /// The mapping is part of the CLI contract: 0 success,
    /// 1 unclassified, 2 input validation, 3 remote connectivity,
    /// 4 deployment (provisioning included), 5 proxy configuration,
    /// 130 interruption.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Connectivity(_) => 3,
            Self::Provisioning(_) | Self::Deployment(_) => 4,
            Self::Configuration(_) => 5,
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}
