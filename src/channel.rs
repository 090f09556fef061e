use crate::error::DeployResult;

/// Result of one remote command: combined stdout/stderr and the
/// command's exit code.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub output: String,
    pub code: i32,
}

impl ExecOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }

    /// Last few lines of the output, for error messages where
    /// the full build log would drown the reason.
    #[must_use]
    pub fn tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.output.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Executes commands on the deployment host.
///
/// Every invocation is independent: no shell state carries over
/// between calls beyond what the remote filesystem and service
/// manager retain. Implementations must fail closed on
/// authentication errors and never prompt.
pub trait CommandChannel {
    /// Run `command` remotely and return its combined output and
    /// exit status. An `Err` means the channel itself failed, not
    /// the remote command.
    fn execute(&self, command: &str) -> DeployResult<ExecOutput>;

    /// Write `content` to `remote_path` by piping it over the
    /// channel's stdin.
    fn upload(&self, content: &str, remote_path: &str) -> DeployResult<()>;
}
