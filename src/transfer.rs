use std::path::Path;

use crate::channel::CommandChannel;
use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::pipeline::Outcome;
use crate::ssh::SshSession;

/// Mirror the local repository tree (minus version-control
/// metadata) to the remote deployment directory. Prefers rsync
/// for delta transfer; falls back to plain scp when rsync is not
/// installed locally.
pub fn mirror(session: &SshSession, local: &Path, remote_dir: &str) -> DeployResult<Outcome> {
    prepare_remote_dir(session, remote_dir)?;

    if cmd::command_exists("rsync") {
        rsync_tree(session, local, remote_dir)?;
        return Ok(Outcome::Success);
    }

    scp_tree(session, local, remote_dir)?;
    Ok(Outcome::Warning(
        "rsync not available locally; copied with scp (no delete semantics)".into(),
    ))
}

/// The deploy directory is root-owned; hand it to the SSH user so
/// the transfer tools can write without privilege.
fn prepare_remote_dir(session: &SshSession, remote_dir: &str) -> DeployResult<()> {
    let command = format!(
        "sudo mkdir -p {remote_dir} && sudo chown {}: {remote_dir}",
        session.user()
    );
    let result = session.execute(&command)?;
    if !result.success() {
        return Err(DeployError::Deployment(format!(
            "could not prepare {remote_dir}: {}",
            result.tail(3)
        )));
    }
    Ok(())
}

fn rsync_tree(session: &SshSession, local: &Path, remote_dir: &str) -> DeployResult<()> {
    let rsh = format!("ssh {}", session.ssh_options().join(" "));
    let source = format!("{}/", local.display());
    let dest = format!("{}:{remote_dir}/", session.destination());

    eprintln!("Syncing {source} -> {dest}");
    cmd::run_interactive(
        "rsync",
        &[
            "-az",
            "--delete",
            "--exclude=.git",
            "-e",
            &rsh,
            &source,
            &dest,
        ],
    )
    .map_err(as_transfer_failure)
}

/// Reclassify transfer tool failures as deployment errors, but
/// let an interrupt keep its own status.
fn as_transfer_failure(e: DeployError) -> DeployError {
    match e {
        DeployError::Interrupted => e,
        other => DeployError::Deployment(format!("file transfer failed: {other}")),
    }
}

fn scp_tree(session: &SshSession, local: &Path, remote_dir: &str) -> DeployResult<()> {
    // `dir/.` makes scp copy the contents, matching rsync's
    // trailing-slash behavior
    let source = format!("{}/.", local.display());
    let dest = format!("{}:{remote_dir}/", session.destination());

    eprintln!("Copying {source} -> {dest} (scp fallback)");
    let options = session.ssh_options();
    let mut args: Vec<&str> = options.iter().map(String::as_str).collect();
    args.push("-r");
    args.push(&source);
    args.push(&dest);

    cmd::run_interactive("scp", &args).map_err(as_transfer_failure)?;

    // scp has no exclude; drop the copied .git afterwards
    let cleanup = session.execute(&format!("rm -rf {remote_dir}/.git"))?;
    if !cleanup.success() {
        eprintln!("could not remove remote .git copy, continuing");
    }
    Ok(())
}
