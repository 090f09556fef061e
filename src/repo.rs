use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::spec::DeploySpec;

/// Ensure a local working copy of the requested branch exists and
/// is current. Returns the checkout directory.
///
/// Two branches: fresh clone when no checkout exists, update in
/// place otherwise. The ephemeral token lives only inside the
/// fetch URL built here; both are zeroized when this function
/// returns, and any git output surfaced in errors is redacted
/// first.
pub fn synchronize(spec: &DeploySpec) -> DeployResult<PathBuf> {
    let dir = PathBuf::from(repo_name(&spec.repo_url));
    let fetch = fetch_url(&spec.repo_url, spec.token.as_ref());

    if dir.join(".git").is_dir() {
        update(spec, &dir, &fetch)?;
    } else {
        clone(spec, &dir, &fetch)?;
    }

    Ok(dir)
}

/// Directory name a clone of `url` produces, also the basis for
/// the container/image name.
#[must_use]
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    if name.is_empty() {
        "app".to_string()
    } else {
        name.to_string()
    }
}

/// Splice the token into the URL as basic-auth userinfo. Only
/// http(s) URLs carry the token; SSH-style URLs are used verbatim.
#[must_use]
pub fn fetch_url(url: &str, token: Option<&SecretString>) -> SecretString {
    if let Some(token) = token {
        for scheme in ["https://", "http://"] {
            if let Some(rest) = url.strip_prefix(scheme) {
                return SecretString::from(format!(
                    "{scheme}{}@{rest}",
                    token.expose_secret()
                ));
            }
        }
    }
    SecretString::from(url.to_string())
}

/// Strip the token from text destined for logs or error messages.
#[must_use]
pub fn redact(text: &str, token: Option<&SecretString>) -> String {
    token.map_or_else(
        || text.to_string(),
        |t| text.replace(t.expose_secret(), "***"),
    )
}

fn clone(spec: &DeploySpec, dir: &Path, fetch: &SecretString) -> DeployResult<()> {
    eprintln!("Cloning {} (branch {})...", spec.repo_url, spec.branch);

    let dir_str = dir.to_string_lossy();
    let result = cmd::capture(
        "git",
        &[
            "clone",
            "--branch",
            &spec.branch,
            "--single-branch",
            fetch.expose_secret(),
            &dir_str,
        ],
    )?;

    if !result.success() {
        return Err(DeployError::Deployment(format!(
            "git clone failed: {}",
            redact(&result.output, spec.token.as_ref())
        )));
    }

    // The clone wrote the authenticated URL into .git/config;
    // replace it with the clean one before anything else runs.
    if spec.token.is_some() {
        cmd::run(
            "git",
            &["-C", &dir_str, "remote", "set-url", "origin", &spec.repo_url],
        )?;
    }

    Ok(())
}

fn update(spec: &DeploySpec, dir: &Path, fetch: &SecretString) -> DeployResult<()> {
    let dir_str = dir.to_string_lossy();
    let current = cmd::run("git", &["-C", &dir_str, "rev-parse", "--abbrev-ref", "HEAD"])?;

    if current == spec.branch {
        eprintln!("Updating existing checkout of {}...", spec.branch);
        let result = cmd::capture(
            "git",
            &[
                "-C",
                &dir_str,
                "pull",
                "--ff-only",
                fetch.expose_secret(),
                &spec.branch,
            ],
        )?;
        if !result.success() {
            return Err(DeployError::Deployment(format!(
                "git pull failed: {}",
                redact(&result.output, spec.token.as_ref())
            )));
        }
        return Ok(());
    }

    eprintln!("Switching checkout from {current} to {}...", spec.branch);
    let fetched = cmd::capture(
        "git",
        &["-C", &dir_str, "fetch", fetch.expose_secret(), &spec.branch],
    )?;
    if !fetched.success() {
        return Err(DeployError::Deployment(format!(
            "git fetch failed: {}",
            redact(&fetched.output, spec.token.as_ref())
        )));
    }

    let checked_out = cmd::capture(
        "git",
        &["-C", &dir_str, "checkout", "-B", &spec.branch, "FETCH_HEAD"],
    )?;
    if !checked_out.success() {
        return Err(DeployError::Deployment(format!(
            "git checkout of {} failed: {}",
            spec.branch,
            redact(&checked_out.output, spec.token.as_ref())
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_strips_git_suffix() {
        assert_eq!(repo_name("https://example.com/acme/webapp.git"), "webapp");
        assert_eq!(repo_name("https://example.com/acme/webapp"), "webapp");
        assert_eq!(repo_name("git@github.com:acme/webapp.git"), "webapp");
        assert_eq!(repo_name("https://example.com/acme/webapp/"), "webapp");
    }

    #[test]
    fn token_spliced_once_as_userinfo() {
        let token = SecretString::from("s3cr3t".to_string());
        let url = fetch_url("https://example.com/app.git", Some(&token));
        let exposed = url.expose_secret();

        assert_eq!(exposed, "https://s3cr3t@example.com/app.git");
        assert_eq!(exposed.matches("s3cr3t").count(), 1);
    }

    #[test]
    fn ssh_urls_bypass_token() {
        let token = SecretString::from("s3cr3t".to_string());
        let url = fetch_url("git@github.com:acme/app.git", Some(&token));

        assert_eq!(url.expose_secret(), "git@github.com:acme/app.git");
    }

    #[test]
    fn no_token_means_clean_url() {
        let url = fetch_url("https://example.com/app.git", None);
        assert_eq!(url.expose_secret(), "https://example.com/app.git");
    }

    #[test]
    fn redact_removes_every_occurrence() {
        let token = SecretString::from("tok123".to_string());
        let text = "fatal: cannot access 'https://tok123@example.com': tok123 rejected";

        let clean = redact(text, Some(&token));

        assert!(!clean.contains("tok123"));
        assert_eq!(clean.matches("***").count(), 2);
    }
}
