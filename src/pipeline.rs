use std::fmt;
use std::thread;

use crate::containers;
use crate::descriptor::Target;
use crate::error::DeployResult;
use crate::nginx::{self, ProxyConfig};
use crate::probes::{self, ValidationReport};
use crate::provision;
use crate::repo;
use crate::spec::DeploySpec;
use crate::ssh::SshSession;
use crate::transfer;

/// Per-step result. Fatal outcomes are `Err(DeployError)`; only
/// the driver turns one into a process exit.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Warning(String),
}

/// The deployment sequence, in its fixed order. Each stage is
/// gated on the prior one succeeding; there is no automatic retry
/// of a failed stage. Re-running the whole sequence is the
/// recovery path, which every stage's idempotency keeps safe and
/// cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectParameters,
    SynchronizeRepository,
    VerifyDescriptor,
    TestConnectivity,
    ProvisionRemote,
    TransferFiles,
    DeployContainers,
    CheckContainerHealth,
    ConfigureProxy,
    ValidateDeployment,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CollectParameters => "collecting parameters",
            Self::SynchronizeRepository => "synchronizing repository",
            Self::VerifyDescriptor => "verifying deployment descriptor",
            Self::TestConnectivity => "testing connectivity",
            Self::ProvisionRemote => "provisioning remote environment",
            Self::TransferFiles => "transferring files",
            Self::DeployContainers => "deploying containers",
            Self::CheckContainerHealth => "checking container health",
            Self::ConfigureProxy => "configuring reverse proxy",
            Self::ValidateDeployment => "validating deployment",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Sequences the deployment stages over one immutable spec.
/// Warnings accumulate across stages and surface in the final
/// summary; the first fatal error short-circuits the run.
pub struct Pipeline {
    spec: DeploySpec,
    stage: Stage,
    warnings: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(spec: DeploySpec) -> Self {
        Self {
            spec,
            stage: Stage::CollectParameters,
            warnings: Vec::new(),
        }
    }

    /// Run the full deploy sequence. On failure the terminating
    /// stage and reason are reported before the error propagates
    /// to the binary, which owns the exit status.
    pub fn deploy(&mut self) -> DeployResult<ValidationReport> {
        match self.run_stages() {
            Ok(report) => {
                self.summarize(&report);
                Ok(report)
            }
            Err(e) => {
                eprintln!();
                eprintln!("Deployment failed while {}: {e}", self.stage);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> DeployResult<ValidationReport> {
        self.enter(Stage::CollectParameters);
        self.spec.validate()?;

        self.enter(Stage::SynchronizeRepository);
        let repo_dir = repo::synchronize(&self.spec)?;

        self.enter(Stage::VerifyDescriptor);
        let target = Target::resolve(&repo_dir)?;
        eprintln!("Mode: {:?}, app: {}", target.mode, target.app_name);

        self.enter(Stage::TestConnectivity);
        let session = SshSession::new(&self.spec.host, &self.spec.user, &self.spec.key_path);
        session.verify()?;

        self.enter(Stage::ProvisionRemote);
        let outcome = provision::provision(&session, &self.spec.user)?;
        self.note(outcome);

        self.enter(Stage::TransferFiles);
        let outcome = transfer::mirror(&session, &repo_dir, &target.remote_dir)?;
        self.note(outcome);

        self.enter(Stage::DeployContainers);
        let outcome = containers::deploy(&session, &target, self.spec.port)?;
        self.note(outcome);

        self.enter(Stage::CheckContainerHealth);
        eprintln!(
            "Waiting {}s for containers to settle...",
            containers::SETTLE.as_secs()
        );
        thread::sleep(containers::SETTLE);
        let outcome = containers::wait_running(&session, &target)?;
        self.note(outcome);

        self.enter(Stage::ConfigureProxy);
        let outcome = nginx::install(&session, &ProxyConfig::new(self.spec.port))?;
        self.note(outcome);

        self.enter(Stage::ValidateDeployment);
        let report = probes::run_battery(&session, &self.spec);

        self.stage = Stage::Done;
        Ok(report)
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        eprintln!();
        eprintln!("==> {stage}");
    }

    fn note(&mut self, outcome: Outcome) {
        if let Outcome::Warning(reason) = outcome {
            eprintln!("warning: {reason}");
            self.warnings.push(reason);
        }
    }

    fn summarize(&self, report: &ValidationReport) {
        eprintln!();
        eprintln!("Deployment complete: {}/{} probes passed", report.passed(), report.probes.len());
        eprintln!("Application: http://{}/", self.spec.host);
        for warning in &self.warnings {
            eprintln!("warning: {warning}");
        }
    }
}
