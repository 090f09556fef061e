use std::thread;
use std::time::Duration;

use crate::channel::CommandChannel;
use crate::descriptor::{DeployMode, Target};
use crate::error::{DeployError, DeployResult};
use crate::pipeline::Outcome;

/// Fixed settle interval after container start, absorbing common
/// entrypoint startup latency. The driver sleeps this long before
/// any health probing begins.
pub const SETTLE: Duration = Duration::from_secs(5);

const HEALTH_ATTEMPTS: u32 = 12;
const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Stop whatever ran before, build fresh, start the new
/// container(s). Failure to stop a prior container is tolerated
/// (it may simply not exist); a build or run failure is fatal.
pub fn deploy(channel: &dyn CommandChannel, target: &Target, port: u16) -> DeployResult<Outcome> {
    match target.mode {
        DeployMode::Compose => deploy_compose(channel, target),
        DeployMode::Dockerfile => deploy_single(channel, target, port),
    }
}

fn deploy_compose(channel: &dyn CommandChannel, target: &Target) -> DeployResult<Outcome> {
    let dir = &target.remote_dir;
    let mut warnings = Vec::new();

    let down = channel.execute(&format!(
        "cd {dir} && sudo docker compose down --remove-orphans"
    ))?;
    if !down.success() {
        warnings.push("no prior composition to stop".to_string());
    }

    eprintln!("Building images (no cache)...");
    let build = channel.execute(&format!("cd {dir} && sudo docker compose build --no-cache"))?;
    if !build.success() {
        return Err(DeployError::Deployment(format!(
            "compose build failed: {}",
            build.tail(10)
        )));
    }

    eprintln!("Starting composition...");
    let up = channel.execute(&format!(
        "cd {dir} && sudo docker compose up -d --remove-orphans"
    ))?;
    if !up.success() {
        return Err(DeployError::Deployment(format!(
            "compose up failed: {}",
            up.tail(10)
        )));
    }

    if warnings.is_empty() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::Warning(warnings.join("; ")))
    }
}

fn deploy_single(
    channel: &dyn CommandChannel,
    target: &Target,
    port: u16,
) -> DeployResult<Outcome> {
    let app = &target.app_name;
    let dir = &target.remote_dir;
    let image = format!("{app}:latest");
    let mut warnings = Vec::new();

    // Anything already bound to the target port has to go first.
    let holders = channel.execute(&format!("sudo docker ps -q --filter publish={port}"))?;
    for id in holders.output.lines().filter(|l| !l.trim().is_empty()) {
        let removed = channel.execute(&format!("sudo docker rm -f {}", id.trim()))?;
        if !removed.success() {
            warnings.push(format!("could not remove container {} on port {port}", id.trim()));
        }
    }

    let named = channel.execute(&format!("sudo docker rm -f {app}"))?;
    if !named.success() {
        warnings.push(format!("no prior container named {app}"));
    }

    eprintln!("Building image {image} (no cache)...");
    let build = channel.execute(&format!("sudo docker build --no-cache -t {image} {dir}"))?;
    if !build.success() {
        return Err(DeployError::Deployment(format!(
            "image build failed: {}",
            build.tail(10)
        )));
    }

    eprintln!("Starting container {app} on 127.0.0.1:{port}...");
    // Loopback bind only; the proxy is the sole public listener.
    let run = channel.execute(&format!(
        "sudo docker run -d --name {app} --restart unless-stopped \
         -p 127.0.0.1:{port}:{port} {image}"
    ))?;
    if !run.success() {
        return Err(DeployError::Deployment(format!(
            "container start failed: {}",
            run.tail(10)
        )));
    }

    if warnings.is_empty() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::Warning(warnings.join("; ")))
    }
}

/// Poll until the deployment reports running containers. Polls
/// `docker inspect` state in single mode and the composition's
/// running services in compose mode.
pub fn wait_running(channel: &dyn CommandChannel, target: &Target) -> DeployResult<Outcome> {
    eprintln!("Waiting for containers to report running...");

    for attempt in 1..=HEALTH_ATTEMPTS {
        let state = match target.mode {
            DeployMode::Compose => compose_running(channel, target)?,
            DeployMode::Dockerfile => single_running(channel, target)?,
        };

        match state {
            ContainerState::Running => {
                eprintln!("  containers running ({attempt}/{HEALTH_ATTEMPTS})");
                return Ok(Outcome::Success);
            }
            ContainerState::Starting(detail) => {
                eprintln!("  {detail} ({attempt}/{HEALTH_ATTEMPTS}), retrying...");
            }
        }

        thread::sleep(HEALTH_INTERVAL);
    }

    Err(DeployError::Deployment(format!(
        "{} did not reach running state after {HEALTH_ATTEMPTS} attempts",
        target.app_name
    )))
}

enum ContainerState {
    Running,
    Starting(String),
}

fn single_running(channel: &dyn CommandChannel, target: &Target) -> DeployResult<ContainerState> {
    let app = &target.app_name;
    let inspected = channel.execute(&format!("sudo docker inspect {app}"))?;
    if !inspected.success() {
        return Ok(ContainerState::Starting(format!("{app} not created yet")));
    }

    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&inspected.output) else {
        return Ok(ContainerState::Starting(format!("{app} state unreadable")));
    };
    let state = &parsed[0]["State"];
    let status = state["Status"].as_str().unwrap_or("unknown");

    if status != "running" {
        return Ok(ContainerState::Starting(format!("{app} is {status}")));
    }

    // Containers with a healthcheck must also report healthy.
    match state["Health"]["Status"].as_str() {
        None | Some("healthy") => Ok(ContainerState::Running),
        Some(health) => Ok(ContainerState::Starting(format!("{app} health: {health}"))),
    }
}

fn compose_running(channel: &dyn CommandChannel, target: &Target) -> DeployResult<ContainerState> {
    let dir = &target.remote_dir;
    let running = channel.execute(&format!(
        "cd {dir} && sudo docker compose ps --status running -q"
    ))?;

    if running.success() && !running.output.trim().is_empty() {
        Ok(ContainerState::Running)
    } else {
        Ok(ContainerState::Starting("no services running yet".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::FakeChannel;
    use crate::descriptor::{DeployMode, REMOTE_DIR, Target};

    fn target(mode: DeployMode) -> Target {
        Target {
            remote_dir: REMOTE_DIR.to_string(),
            mode,
            app_name: "webapp".to_string(),
        }
    }

    #[test]
    fn single_mode_binds_loopback_only() {
        let channel = FakeChannel::new();

        deploy(&channel, &target(DeployMode::Dockerfile), 8080).unwrap();

        assert!(channel.ran("-p 127.0.0.1:8080:8080"));
        assert!(!channel.commands().iter().any(|c| c.contains("-p 8080:8080")));
        assert!(!channel.commands().iter().any(|c| c.contains("0.0.0.0")));
    }

    #[test]
    fn single_mode_builds_without_cache() {
        let channel = FakeChannel::new();

        deploy(&channel, &target(DeployMode::Dockerfile), 3000).unwrap();

        assert!(channel.ran("docker build --no-cache -t webapp:latest /opt/app_deploy"));
        assert!(channel.ran("--restart unless-stopped"));
    }

    #[test]
    fn missing_prior_container_is_tolerated() {
        let channel = FakeChannel::new().respond(
            "docker rm -f webapp",
            1,
            "Error: No such container: webapp",
        );

        let outcome = deploy(&channel, &target(DeployMode::Dockerfile), 3000).unwrap();

        match outcome {
            Outcome::Warning(reason) => assert!(reason.contains("webapp")),
            Outcome::Success => panic!("expected a tolerated warning"),
        }
        assert!(channel.ran("docker build"));
    }

    #[test]
    fn build_failure_is_fatal() {
        let channel =
            FakeChannel::new().respond("docker build", 1, "Step 3/7 : RUN make\nerror: boom");

        let err = deploy(&channel, &target(DeployMode::Dockerfile), 3000).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert!(!channel.ran("docker run"));
    }

    #[test]
    fn compose_mode_rebuilds_and_removes_orphans() {
        let channel = FakeChannel::new();

        deploy(&channel, &target(DeployMode::Compose), 8080).unwrap();

        assert!(channel.ran("docker compose build --no-cache"));
        assert!(channel.ran("docker compose up -d --remove-orphans"));
    }

    #[test]
    fn compose_down_failure_is_tolerated() {
        let channel = FakeChannel::new().respond("compose down", 1, "no such file");

        let outcome = deploy(&channel, &target(DeployMode::Compose), 8080).unwrap();

        assert!(matches!(outcome, Outcome::Warning(_)));
        assert!(channel.ran("docker compose up"));
    }

    #[test]
    fn wait_running_accepts_running_state() {
        let inspect = r#"[{"State":{"Status":"running"}}]"#;
        let channel = FakeChannel::new().respond("docker inspect webapp", 0, inspect);

        let outcome = wait_running(&channel, &target(DeployMode::Dockerfile)).unwrap();
        assert!(matches!(outcome, Outcome::Success));
    }

    #[test]
    fn wait_running_requires_healthy_when_healthcheck_present() {
        let inspect = r#"[{"State":{"Status":"running","Health":{"Status":"healthy"}}}]"#;
        let channel = FakeChannel::new().respond("docker inspect webapp", 0, inspect);

        let outcome = wait_running(&channel, &target(DeployMode::Dockerfile)).unwrap();
        assert!(matches!(outcome, Outcome::Success));
    }

    #[test]
    fn compose_wait_checks_running_services() {
        let channel = FakeChannel::new().respond("compose ps --status running", 0, "abc123\n");

        let outcome = wait_running(&channel, &target(DeployMode::Compose)).unwrap();
        assert!(matches!(outcome, Outcome::Success));
    }
}
