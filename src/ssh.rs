use crate::channel::{CommandChannel, ExecOutput};
use crate::cmd;
use crate::error::{DeployError, DeployResult};

/// ssh reserves 255 for its own failures (auth, connect); any
/// other code belongs to the remote command.
const SSH_CHANNEL_FAILURE: i32 = 255;

const DEFAULT_CONNECT_TIMEOUT_SECS: u32 = 10;
const PROBE_CONNECT_TIMEOUT_SECS: u32 = 5;

/// SSH session for executing commands and writing files on the
/// deployment host. Key-based authentication only; `BatchMode`
/// keeps every call non-interactive so an auth failure fails
/// closed instead of prompting.
///
/// The connect timeout is bounded while command execution is not:
/// package installs and image builds signal progress, not latency.
pub struct SshSession {
    host: String,
    user: String,
    key: String,
    connect_timeout_secs: u32,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str, key: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: key.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub const fn connect_timeout_secs(mut self, secs: u32) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Options shared with scp and rsync's `-e ssh`.
    #[must_use]
    pub fn ssh_options(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.key.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ]
    }

    /// Verify the channel with an aggressive timeout. Used by the
    /// connectivity gate before any provisioning starts.
    pub fn verify(&self) -> DeployResult<()> {
        let args = self.build_ssh_args("echo ok", PROBE_CONNECT_TIMEOUT_SECS);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = cmd::capture("ssh", &refs)?;

        if result.code == SSH_CHANNEL_FAILURE {
            return Err(DeployError::Connectivity(format!(
                "cannot reach {}: {}",
                self.destination(),
                result.output
            )));
        }
        if !result.success() {
            return Err(DeployError::Connectivity(format!(
                "connectivity probe failed on {}: {}",
                self.destination(),
                result.output
            )));
        }
        Ok(())
    }

    fn build_ssh_args(&self, command: &str, connect_timeout_secs: u32) -> Vec<String> {
        let mut args = self.ssh_options();
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={connect_timeout_secs}"));
        args.push(self.destination());
        args.push(command.to_string());
        args
    }
}

impl CommandChannel for SshSession {
    fn execute(&self, command: &str) -> DeployResult<ExecOutput> {
        let args = self.build_ssh_args(command, self.connect_timeout_secs);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = cmd::capture("ssh", &refs)?;

        if result.code == SSH_CHANNEL_FAILURE {
            return Err(DeployError::Connectivity(format!(
                "lost channel to {}: {}",
                self.destination(),
                result.output
            )));
        }
        Ok(result)
    }

    fn upload(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        let command = format!("cat > {remote_path}");
        let args = self.build_ssh_args(&command, self.connect_timeout_secs);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = cmd::run_with_stdin("ssh", &refs, content.as_bytes())?;

        if result.code == SSH_CHANNEL_FAILURE {
            return Err(DeployError::Connectivity(format!(
                "lost channel to {} while writing {remote_path}",
                self.destination()
            )));
        }
        if !result.success() {
            return Err(DeployError::Deployment(format!(
                "failed to write {remote_path}: {}",
                result.output
            )));
        }
        Ok(())
    }
}
