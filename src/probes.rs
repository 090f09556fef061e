use serde::Serialize;

use crate::channel::CommandChannel;
use crate::cmd;
use crate::error::DeployResult;
use crate::spec::DeploySpec;

/// Post-deploy probes never abort: their job is to surface the
/// deployment's actual state, not to change the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pass,
    Warn,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub name: &'static str,
    pub status: ProbeStatus,
    pub detail: String,
}

/// Aggregated result of the validation battery.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub probes: Vec<ProbeReport>,
}

impl ValidationReport {
    #[must_use]
    pub fn passed(&self) -> usize {
        self.probes
            .iter()
            .filter(|p| p.status == ProbeStatus::Pass)
            .count()
    }

    #[must_use]
    pub fn warnings(&self) -> usize {
        self.probes.len() - self.passed()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.warnings() == 0
    }

    pub fn to_json(&self) -> DeployResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run the fixed probe battery. The external probe runs from this
/// process's own vantage point, which is what separates "app
/// broken" from "firewall blocking outside traffic".
#[must_use]
pub fn run_battery(channel: &dyn CommandChannel, spec: &DeploySpec) -> ValidationReport {
    let port = spec.port;
    let probes = vec![
        service_probe(channel, "docker service", "docker"),
        service_probe(channel, "nginx service", "nginx"),
        containers_up_probe(channel),
        remote_http_probe(channel, "app on loopback port", port),
        remote_http_probe(channel, "proxy on loopback port 80", 80),
        external_probe(&spec.host),
    ];

    for probe in &probes {
        let marker = match probe.status {
            ProbeStatus::Pass => "ok",
            ProbeStatus::Warn => "WARN",
        };
        eprintln!("  [{marker}] {}: {}", probe.name, probe.detail);
    }

    ValidationReport { probes }
}

fn service_probe(
    channel: &dyn CommandChannel,
    name: &'static str,
    service: &str,
) -> ProbeReport {
    match channel.execute(&format!("systemctl is-active {service}")) {
        Ok(result) if result.success() => pass(name, "active"),
        Ok(result) => warn(name, format!("not active: {}", result.output)),
        Err(e) => warn(name, format!("probe failed: {e}")),
    }
}

fn containers_up_probe(channel: &dyn CommandChannel) -> ProbeReport {
    const NAME: &str = "containers up";
    let listing = "sudo docker ps --format '{{.Names}} {{.Status}}'";

    match channel.execute(listing) {
        Ok(result) if result.success() => {
            let up: Vec<&str> = result
                .output
                .lines()
                .filter(|l| l.contains("Up"))
                .collect();
            if up.is_empty() {
                warn(NAME, "no running containers".to_string())
            } else {
                pass(NAME, &up.join(", "))
            }
        }
        Ok(result) => warn(NAME, format!("docker ps failed: {}", result.output)),
        Err(e) => warn(NAME, format!("probe failed: {e}")),
    }
}

/// Any HTTP status counts as alive; "000" from curl means the
/// connection itself was refused.
fn remote_http_probe(channel: &dyn CommandChannel, name: &'static str, port: u16) -> ProbeReport {
    let command = format!(
        "curl -s -o /dev/null -m 10 -w '%{{http_code}}' http://127.0.0.1:{port}/"
    );

    match channel.execute(&command) {
        Ok(result) => classify_http(name, &result.output),
        Err(e) => warn(name, format!("probe failed: {e}")),
    }
}

fn external_probe(host: &str) -> ProbeReport {
    const NAME: &str = "external address";
    let url = format!("http://{host}:80/");

    match cmd::capture(
        "curl",
        &["-s", "-o", "/dev/null", "-m", "10", "-w", "%{http_code}", &url],
    ) {
        Ok(result) => classify_http(NAME, &result.output),
        Err(e) => warn(NAME, format!("probe failed: {e}")),
    }
}

fn classify_http(name: &'static str, output: &str) -> ProbeReport {
    let code = output.trim().trim_matches('\'');
    if code.is_empty() || code == "000" {
        warn(name, "no response (connection refused or timed out)".to_string())
    } else {
        pass(name, &format!("HTTP {code}"))
    }
}

fn pass(name: &'static str, detail: &str) -> ProbeReport {
    ProbeReport {
        name,
        status: ProbeStatus::Pass,
        detail: detail.to_string(),
    }
}

fn warn(name: &'static str, detail: String) -> ProbeReport {
    ProbeReport {
        name,
        status: ProbeStatus::Warn,
        detail,
    }
}
