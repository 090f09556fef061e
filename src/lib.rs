//! Deployment orchestrator for a single remote Linux host.
//!
//! Ballista takes a Git-hosted application with container build
//! instructions and launches it on a server you already have:
//! provision Docker, the compose plugin, and Nginx over SSH, sync
//! the code, build and run it bound to loopback, and front it
//! with an Nginx reverse proxy on port 80. Re-runs are idempotent
//! and `--cleanup` tears everything back down.
//!
//! # Overview
//!
//! A deployment is described by a [`DeploySpec`] and driven by a
//! [`Pipeline`] through a fixed sequence of stages:
//!
//! 1. **Synchronize** - clone or fast-forward the branch locally,
//!    splicing an ephemeral access token into the fetch URL only
//!    for the one fetch that needs it
//! 2. **Verify** - require a `Dockerfile` or compose descriptor
//!    at the repository root (compose takes precedence)
//! 3. **Provision** - probe-then-install Docker, the compose
//!    plugin, and Nginx via the host's package manager
//! 4. **Transfer** - mirror the tree to `/opt/app_deploy` with
//!    rsync (scp fallback)
//! 5. **Deploy** - rebuild without cache and start the
//!    container(s) on `127.0.0.1:<port>`; the proxy is the only
//!    public listener
//! 6. **Proxy** - render and install the site config, validate
//!    with `nginx -t` before any reload touches a working proxy
//! 7. **Validate** - a probe battery that reports state without
//!    ever changing the exit status
//!
//! Every remote operation goes through the
//! [`CommandChannel`](channel::CommandChannel) trait, so each
//! stage is testable against a scripted channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use ballista::{DeploySpec, Pipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let spec = DeploySpec::new(
//!         "https://github.com/acme/webapp.git",
//!         "deploy",
//!         "203.0.113.10",
//!         "/home/me/.ssh/id_ed25519",
//!         8080,
//!     )
//!     .branch("main");
//!
//!     let mut pipeline = Pipeline::new(spec);
//!     let report = pipeline.deploy()?;
//!     println!("{}", report.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! Exit statuses are part of the CLI contract: 0 success,
//! 1 unclassified, 2 validation, 3 connectivity, 4 deployment,
//! 5 proxy configuration, 130 interrupted.

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod channel;
pub mod cleanup;
pub mod cmd;
pub mod containers;
pub mod descriptor;
pub mod error;
pub mod nginx;
pub mod pipeline;
pub mod probes;
pub mod provision;
pub mod repo;
pub mod spec;
pub mod ssh;
pub mod transfer;

pub use descriptor::DeployMode;
pub use descriptor::Target;
pub use error::DeployError;
pub use error::DeployResult;
pub use nginx::ProxyConfig;
pub use pipeline::Outcome;
pub use pipeline::Pipeline;
pub use pipeline::Stage;
pub use probes::ValidationReport;
pub use provision::PackageManager;
pub use spec::DeploySpec;
pub use ssh::SshSession;
