use std::fs;
use std::path::Path;

use docker_compose_types::Compose;

use crate::error::{DeployError, DeployResult};

/// Where the synced application tree lives on the host.
pub const REMOTE_DIR: &str = "/opt/app_deploy";

/// Name of the Nginx site file. Fixed so cleanup can find it
/// without knowing the repository.
pub const SITE_NAME: &str = "app_deploy";

const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// How the application gets built and started on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// A compose descriptor at the repository root. Takes
    /// precedence when a Dockerfile is also present.
    Compose,
    /// A single `Dockerfile` at the repository root.
    Dockerfile,
}

/// Resolved deployment target: remote path, detected mode, and
/// the derived application name.
#[derive(Debug, Clone)]
pub struct Target {
    pub remote_dir: String,
    pub mode: DeployMode,
    pub app_name: String,
}

impl Target {
    pub fn resolve(repo_dir: &Path) -> DeployResult<Self> {
        let mode = detect_mode(repo_dir)?;
        Ok(Self {
            remote_dir: REMOTE_DIR.to_string(),
            mode,
            app_name: app_name_from(repo_dir),
        })
    }
}

/// Find the deployment descriptor at the repository root. This is
/// the one precondition every later step depends on.
pub fn detect_mode(repo_dir: &Path) -> DeployResult<DeployMode> {
    for name in COMPOSE_FILES {
        let path = repo_dir.join(name);
        if path.is_file() {
            let services = validate_compose(&path)?;
            eprintln!("Found {name} ({services} services)");
            return Ok(DeployMode::Compose);
        }
    }

    if repo_dir.join("Dockerfile").is_file() {
        return Ok(DeployMode::Dockerfile);
    }

    Err(DeployError::Validation(format!(
        "no deployment descriptor in {}: expected a Dockerfile or a compose file",
        repo_dir.display()
    )))
}

/// A compose descriptor must parse and declare at least one
/// service before we commit to multi-container mode.
fn validate_compose(path: &Path) -> DeployResult<usize> {
    let text = fs::read_to_string(path)?;
    let compose: Compose = serde_yaml::from_str(&text).map_err(|e| {
        DeployError::Validation(format!("invalid compose descriptor {}: {e}", path.display()))
    })?;

    let count = compose.services.0.len();
    if count == 0 {
        return Err(DeployError::Validation(format!(
            "compose descriptor {} declares no services",
            path.display()
        )));
    }
    Ok(count)
}

/// Derive a docker-safe application name from the checkout
/// directory name.
#[must_use]
pub fn app_name_from(repo_dir: &Path) -> String {
    let raw = repo_dir
        .file_name()
        .map_or_else(|| "app".to_string(), |n| n.to_string_lossy().to_string());

    let name: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let name = name.trim_matches('-').to_string();

    if name.is_empty() { "app".to_string() } else { name }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    const COMPOSE_ONE_SERVICE: &str = "services:\n  web:\n    image: nginx\n";

    #[test]
    fn dockerfile_only_selects_single_mode() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "Dockerfile", "FROM scratch\n");

        assert_eq!(detect_mode(dir.path()).unwrap(), DeployMode::Dockerfile);
    }

    #[test]
    fn compose_takes_precedence_over_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "Dockerfile", "FROM scratch\n");
        write_file(dir.path(), "docker-compose.yml", COMPOSE_ONE_SERVICE);

        assert_eq!(detect_mode(dir.path()).unwrap(), DeployMode::Compose);
    }

    #[test]
    fn missing_descriptor_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = detect_mode(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_compose_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "compose.yml", "services: {}\n");

        let err = detect_mode(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_compose_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "compose.yaml", ":\n  - not yaml {{{");

        let err = detect_mode(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn app_name_is_sanitized() {
        assert_eq!(app_name_from(Path::new("/tmp/My App_2")), "my-app-2");
        assert_eq!(app_name_from(Path::new("webapp")), "webapp");
        assert_eq!(app_name_from(Path::new("___")), "app");
    }
}
