use crate::channel::CommandChannel;
use crate::descriptor::{REMOTE_DIR, SITE_NAME};
use crate::error::DeployResult;

/// Symmetric teardown. Every step is best-effort: the goal is to
/// leave the host as clean as possible, not to abort on the first
/// obstacle. Only a lost channel stops the run.
pub fn run(channel: &dyn CommandChannel) -> DeployResult<Vec<String>> {
    let steps: [(&str, String); 6] = [
        (
            "stop composition",
            format!("cd {REMOTE_DIR} && sudo docker compose down --remove-orphans"),
        ),
        (
            "stop containers",
            "sudo docker ps -aq | xargs -r sudo docker stop".to_string(),
        ),
        (
            "remove containers",
            "sudo docker ps -aq | xargs -r sudo docker rm -f".to_string(),
        ),
        (
            "prune docker resources",
            "sudo docker system prune -af --volumes".to_string(),
        ),
        (
            "remove deployment directory",
            format!("sudo rm -rf {REMOTE_DIR}"),
        ),
        (
            "remove proxy configuration",
            format!(
                "sudo rm -f /etc/nginx/sites-available/{SITE_NAME}.conf \
                 /etc/nginx/sites-enabled/{SITE_NAME}.conf"
            ),
        ),
    ];

    let mut skipped = Vec::new();

    for (label, command) in &steps {
        eprintln!("Cleanup: {label}...");
        let result = channel.execute(command)?;
        if !result.success() {
            eprintln!("  {label} skipped: {}", result.tail(2));
            skipped.push((*label).to_string());
        }
    }

    // Reload only when nginx is actually running; starting it
    // just to drop a site would be the opposite of cleanup.
    if channel.execute("systemctl is-active nginx")?.success() {
        let reloaded = channel.execute("sudo systemctl reload nginx")?;
        if !reloaded.success() {
            eprintln!("  nginx reload skipped: {}", reloaded.tail(2));
            skipped.push("reload nginx".to_string());
        }
    }

    eprintln!();
    if skipped.is_empty() {
        eprintln!("Cleanup complete.");
    } else {
        eprintln!("Cleanup complete; skipped: {}", skipped.join(", "));
    }

    Ok(skipped)
}
