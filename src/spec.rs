use std::fs::File;
use std::net::Ipv4Addr;
use std::path::Path;

use secrecy::SecretString;

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_BRANCH: &str = "main";

/// Everything one deployment needs, collected up front and
/// immutable afterwards.
///
/// The token, when present, is exposed exactly once to build the
/// authenticated fetch URL and is zeroized when the repository
/// synchronizer returns.
///
/// # Example
///
/// ```
/// use ballista::DeploySpec;
///
/// let spec = DeploySpec::new(
///     "https://example.com/app.git",
///     "deploy",
///     "203.0.113.10",
///     "/home/me/.ssh/id_ed25519",
///     8080,
/// )
/// .branch("release");
///
/// assert_eq!(spec.branch, "release");
/// assert_eq!(spec.port, 8080);
/// ```
#[derive(Debug)]
pub struct DeploySpec {
    pub repo_url: String,
    pub token: Option<SecretString>,
    pub branch: String,
    pub user: String,
    pub host: String,
    pub key_path: String,
    pub port: u16,
}

impl DeploySpec {
    #[must_use]
    pub fn new(repo_url: &str, user: &str, host: &str, key_path: &str, port: u16) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            token: None,
            branch: DEFAULT_BRANCH.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            key_path: key_path.to_string(),
            port,
        }
    }

    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    #[must_use]
    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Run every input predicate and surface the first failure.
    pub fn validate(&self) -> DeployResult<()> {
        if !is_valid_repo_url(&self.repo_url) {
            return Err(DeployError::Validation(format!(
                "repository URL not recognized: {}",
                self.repo_url
            )));
        }
        if self.branch.is_empty() {
            return Err(DeployError::Validation("branch name is empty".into()));
        }
        if self.user.is_empty() {
            return Err(DeployError::Validation("SSH username is empty".into()));
        }
        if !is_dotted_quad(&self.host) {
            return Err(DeployError::Validation(format!(
                "server address must be a dotted-quad IPv4 address, got: {}",
                self.host
            )));
        }
        if !is_valid_port(self.port) {
            return Err(DeployError::Validation("port must be 1-65535".into()));
        }
        key_file_readable(&self.key_path)
    }
}

/// Accepts http(s) and ssh URLs plus the scp-like `git@host:path`
/// form.
#[must_use]
pub fn is_valid_repo_url(url: &str) -> bool {
    for scheme in ["https://", "http://", "ssh://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            let mut parts = rest.splitn(2, '/');
            let host = parts.next().unwrap_or("");
            let path = parts.next().unwrap_or("");
            return !host.is_empty() && !path.is_empty();
        }
    }

    // scp-like: user@host:path
    if let Some((userinfo, rest)) = url.split_once('@') {
        if let Some((host, path)) = rest.split_once(':') {
            return !userinfo.is_empty() && !host.is_empty() && !path.is_empty();
        }
    }

    false
}

#[must_use]
pub fn is_dotted_quad(addr: &str) -> bool {
    addr.parse::<Ipv4Addr>().is_ok()
}

#[must_use]
pub const fn is_valid_port(port: u16) -> bool {
    port != 0
}

/// The key must exist and be openable by this process; a key we
/// cannot read fails before any remote work starts.
pub fn key_file_readable(path: &str) -> DeployResult<()> {
    let key = Path::new(path);
    if !key.is_file() {
        return Err(DeployError::Validation(format!(
            "SSH key not found: {path}"
        )));
    }
    File::open(key).map_err(|e| {
        DeployError::Validation(format!("SSH key not readable: {path} ({e})"))
    })?;
    Ok(())
}
