use crate::channel::CommandChannel;
use crate::error::{DeployError, DeployResult};
use crate::pipeline::Outcome;

/// Host package manager, detected once and dispatched on
/// everywhere instead of re-probing inside every install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Yum,
    Dnf,
}

impl PackageManager {
    /// Probe for a supported package manager binary on the host.
    pub fn detect(channel: &dyn CommandChannel) -> DeployResult<Self> {
        let candidates = [
            ("apt-get", Self::Apt),
            ("yum", Self::Yum),
            ("dnf", Self::Dnf),
        ];

        for (binary, manager) in candidates {
            if channel.execute(&format!("command -v {binary}"))?.success() {
                return Ok(manager);
            }
        }

        Err(DeployError::Provisioning(
            "no supported package manager on the host (need apt, yum, or dnf)".into(),
        ))
    }

    #[must_use]
    pub fn install_command(self, packages: &str) -> String {
        match self {
            Self::Apt => format!(
                "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y {packages}"
            ),
            Self::Yum => format!("sudo yum install -y {packages}"),
            Self::Dnf => format!("sudo dnf install -y {packages}"),
        }
    }

    #[must_use]
    pub const fn refresh_command(self) -> Option<&'static str> {
        match self {
            Self::Apt => Some("sudo apt-get update -y"),
            Self::Yum | Self::Dnf => None,
        }
    }

    #[must_use]
    pub const fn docker_package(self) -> &'static str {
        match self {
            Self::Apt => "docker.io",
            Self::Yum | Self::Dnf => "docker",
        }
    }
}

/// Idempotently ensure Docker, the compose plugin, and Nginx are
/// installed and running. Already-installed components are
/// no-ops, which is what makes the whole step safe to re-run.
pub fn provision(channel: &dyn CommandChannel, user: &str) -> DeployResult<Outcome> {
    let manager = PackageManager::detect(channel)?;
    eprintln!("Package manager: {manager:?}");

    let mut refreshed = false;
    ensure_docker(channel, manager, &mut refreshed)?;
    ensure_compose(channel, manager, &mut refreshed)?;
    ensure_nginx(channel, manager, &mut refreshed)?;

    let mut warnings = Vec::new();
    if let Some(warning) = grant_docker_group(channel, user)? {
        warnings.push(warning);
    }

    verify_versions(channel)?;

    if warnings.is_empty() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::Warning(warnings.join("; ")))
    }
}

fn installed(channel: &dyn CommandChannel, probe: &str) -> DeployResult<bool> {
    Ok(channel.execute(probe)?.success())
}

/// Run the package index refresh once, ahead of the first actual
/// install on apt hosts.
fn refresh_once(
    channel: &dyn CommandChannel,
    manager: PackageManager,
    refreshed: &mut bool,
) -> DeployResult<()> {
    if *refreshed {
        return Ok(());
    }
    *refreshed = true;

    if let Some(refresh) = manager.refresh_command() {
        let result = channel.execute(refresh)?;
        if !result.success() {
            eprintln!("package index refresh failed, continuing: {}", result.tail(3));
        }
    }
    Ok(())
}

fn install(
    channel: &dyn CommandChannel,
    manager: PackageManager,
    packages: &str,
) -> DeployResult<bool> {
    Ok(channel.execute(&manager.install_command(packages))?.success())
}

fn enable_service(channel: &dyn CommandChannel, service: &str) -> DeployResult<()> {
    let result = channel.execute(&format!("sudo systemctl enable --now {service}"))?;
    if !result.success() {
        return Err(DeployError::Provisioning(format!(
            "failed to enable {service}: {}",
            result.tail(5)
        )));
    }
    Ok(())
}

fn ensure_docker(
    channel: &dyn CommandChannel,
    manager: PackageManager,
    refreshed: &mut bool,
) -> DeployResult<()> {
    if installed(channel, "command -v docker")? {
        eprintln!("docker already installed");
    } else {
        eprintln!("Installing docker...");
        refresh_once(channel, manager, refreshed)?;
        if !install(channel, manager, manager.docker_package())? {
            return Err(DeployError::Provisioning(
                "docker installation failed".into(),
            ));
        }
    }
    enable_service(channel, "docker")
}

/// The compose plugin package name settled on `docker-compose-plugin`
/// across the supported distros; older hosts only carry the
/// standalone `docker-compose`. Try the plugin first, fall back.
fn ensure_compose(
    channel: &dyn CommandChannel,
    manager: PackageManager,
    refreshed: &mut bool,
) -> DeployResult<()> {
    let have_plugin = installed(channel, "sudo docker compose version")?;
    let have_standalone = installed(channel, "command -v docker-compose")?;
    if have_plugin || have_standalone {
        eprintln!("docker compose already installed");
        return Ok(());
    }

    eprintln!("Installing docker compose...");
    refresh_once(channel, manager, refreshed)?;
    if install(channel, manager, "docker-compose-plugin")? {
        return Ok(());
    }
    if install(channel, manager, "docker-compose")? {
        return Ok(());
    }

    Err(DeployError::Provisioning(
        "docker compose installation failed".into(),
    ))
}

fn ensure_nginx(
    channel: &dyn CommandChannel,
    manager: PackageManager,
    refreshed: &mut bool,
) -> DeployResult<()> {
    if installed(channel, "command -v nginx")? {
        eprintln!("nginx already installed");
    } else {
        eprintln!("Installing nginx...");
        refresh_once(channel, manager, refreshed)?;
        if !install(channel, manager, "nginx")? {
            return Err(DeployError::Provisioning(
                "nginx installation failed".into(),
            ));
        }
    }
    enable_service(channel, "nginx")
}

/// Group membership only affects future unprivileged sessions;
/// the current session runs docker under sudo either way.
fn grant_docker_group(
    channel: &dyn CommandChannel,
    user: &str,
) -> DeployResult<Option<String>> {
    let result = channel.execute(&format!("sudo usermod -aG docker {user}"))?;
    if result.success() {
        Ok(None)
    } else {
        Ok(Some(format!(
            "could not add {user} to the docker group: {}",
            result.tail(2)
        )))
    }
}

/// All three tools must report a version before provisioning is
/// declared done.
fn verify_versions(channel: &dyn CommandChannel) -> DeployResult<()> {
    let checks = [
        ("docker", "sudo docker --version"),
        (
            "docker compose",
            "sudo docker compose version || docker-compose --version",
        ),
        ("nginx", "nginx -v"),
    ];

    for (label, command) in checks {
        let result = channel.execute(command)?;
        if !result.success() || result.output.is_empty() {
            return Err(DeployError::Provisioning(format!(
                "{label} did not report a version after installation"
            )));
        }
        eprintln!("{label}: {}", result.output.lines().next().unwrap_or(""));
    }
    Ok(())
}
