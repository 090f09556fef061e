use std::process::ExitCode;

use clap::Parser;
use secrecy::SecretString;

use ballista::error::{DeployError, DeployResult};
use ballista::{DeploySpec, Pipeline, SshSession, cleanup, spec};

/// Environment variable holding the optional short-lived Git
/// access token. An environment variable rather than a flag keeps
/// it out of shell history and process listings.
const TOKEN_ENV: &str = "GIT_ACCESS_TOKEN";

#[derive(Parser)]
#[command(name = "ballista", version)]
#[command(about = "Deploy a Git-hosted application to a remote host behind Nginx")]
struct Cli {
    /// Tear the deployment down instead of deploying
    #[arg(long)]
    cleanup: bool,

    /// Git repository URL (https, ssh, or scp-like)
    #[arg(long)]
    repo: Option<String>,

    /// Branch to deploy
    #[arg(long, default_value = "main")]
    branch: String,

    /// SSH username on the server
    #[arg(long)]
    user: Option<String>,

    /// Server IPv4 address
    #[arg(long)]
    host: Option<String>,

    /// Path to the SSH private key
    #[arg(long)]
    key: Option<String>,

    /// Application port (1-65535)
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> ExitCode {
    // clap itself exits 2 on unrecognized flags, matching the
    // validation-error status.
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Race the blocking pipeline against Ctrl-C so an interrupt
/// still reaches the reporting path instead of killing the
/// process mid-write.
fn run(cli: Cli) -> DeployResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    runtime.block_on(async {
        let work = tokio::task::spawn_blocking(move || execute(cli));

        tokio::select! {
            joined = work => joined
                .map_err(|e| DeployError::Other(format!("worker failed: {e}")))?,
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                eprintln!(
                    "Interrupted. The host keeps its current state; \
                     re-run to continue or use --cleanup."
                );
                // exit here: waiting for the blocking task would
                // hold the process open until the remote command
                // returns
                std::process::exit(i32::from(DeployError::Interrupted.exit_code()));
            }
        }
    })
}

fn execute(cli: Cli) -> DeployResult<()> {
    if cli.cleanup {
        run_cleanup(&cli)
    } else {
        let mut pipeline = Pipeline::new(deploy_spec(cli)?);
        pipeline.deploy().map(|_| ())
    }
}

/// Teardown is independent of the deploy sequence and needs only
/// the connection triple.
fn run_cleanup(cli: &Cli) -> DeployResult<()> {
    let user = required(cli.user.clone(), "user")?;
    let host = required(cli.host.clone(), "host")?;
    let key = required(cli.key.clone(), "key")?;

    if !spec::is_dotted_quad(&host) {
        return Err(DeployError::Validation(format!(
            "server address must be a dotted-quad IPv4 address, got: {host}"
        )));
    }
    spec::key_file_readable(&key)?;

    let session = SshSession::new(&host, &user, &key);
    session.verify()?;
    cleanup::run(&session).map(|_| ())
}

fn required(value: Option<String>, flag: &str) -> DeployResult<String> {
    value.ok_or_else(|| DeployError::Validation(format!("missing required --{flag}")))
}

fn deploy_spec(cli: Cli) -> DeployResult<DeploySpec> {
    let repo = required(cli.repo, "repo")?;
    let user = required(cli.user, "user")?;
    let host = required(cli.host, "host")?;
    let key = required(cli.key, "key")?;
    let port = cli
        .port
        .ok_or_else(|| DeployError::Validation("missing required --port".into()))?;

    let mut spec = DeploySpec::new(&repo, &user, &host, &key, port).branch(&cli.branch);
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            spec = spec.token(SecretString::from(token));
        }
    }
    Ok(spec)
}

