use crate::channel::CommandChannel;
use crate::descriptor::SITE_NAME;
use crate::error::{DeployError, DeployResult};
use crate::pipeline::Outcome;

/// Nginx site configuration fronting the deployed application.
///
/// Public port 80 routes to the container's loopback port; the
/// upstream port is the template's only variable.
///
/// # Example
///
/// ```
/// use ballista::ProxyConfig;
///
/// let config = ProxyConfig::new(8080);
/// let text = config.render();
///
/// assert!(text.contains("proxy_pass http://127.0.0.1:8080;"));
/// assert!(text.contains("listen 80;"));
/// ```
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen_port: u16,
    pub upstream_port: u16,
    pub access_log: String,
    pub error_log: String,
}

impl ProxyConfig {
    #[must_use]
    pub fn new(upstream_port: u16) -> Self {
        Self {
            listen_port: 80,
            upstream_port,
            access_log: format!("/var/log/nginx/{SITE_NAME}.access.log"),
            error_log: format!("/var/log/nginx/{SITE_NAME}.error.log"),
        }
    }

    /// Render the site configuration. HTTP/1.1 with upgrade
    /// headers keeps websocket and streaming connections alive
    /// through the proxy; `/health` answers without touching the
    /// upstream.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            r#"server {{
    listen {listen};
    listen [::]:{listen};
    server_name _;

    access_log {access};
    error_log {error};

    add_header X-Content-Type-Options "nosniff" always;
    add_header X-Frame-Options "DENY" always;
    add_header X-XSS-Protection "1; mode=block" always;
    add_header Referrer-Policy "strict-origin-when-cross-origin" always;

    location /health {{
        add_header Content-Type text/plain;
        return 200 "ok\n";
    }}

    location / {{
        proxy_pass http://127.0.0.1:{upstream};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection "upgrade";
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_read_timeout 300s;
    }}
}}
"#,
            listen = self.listen_port,
            access = self.access_log,
            error = self.error_log,
            upstream = self.upstream_port,
        )
    }
}

/// Install the rendered configuration: stage it, move it into the
/// available-sites directory (atomic replace), enable the site,
/// disable the distro default, validate, then reload. Validation
/// failure is fatal before the reload, so a broken config never
/// replaces a working one.
pub fn install(channel: &dyn CommandChannel, config: &ProxyConfig) -> DeployResult<Outcome> {
    let available = format!("/etc/nginx/sites-available/{SITE_NAME}.conf");
    let enabled = format!("/etc/nginx/sites-enabled/{SITE_NAME}.conf");
    let staged = format!("/tmp/{SITE_NAME}.conf");

    let dirs = channel.execute(
        "sudo mkdir -p /etc/nginx/sites-available /etc/nginx/sites-enabled",
    )?;
    if !dirs.success() {
        return Err(DeployError::Configuration(format!(
            "cannot create nginx site directories: {}",
            dirs.tail(3)
        )));
    }

    channel.upload(&config.render(), &staged)?;

    let installed = channel.execute(&format!("sudo mv -f {staged} {available}"))?;
    if !installed.success() {
        return Err(DeployError::Configuration(format!(
            "cannot install site configuration: {}",
            installed.tail(3)
        )));
    }

    let linked = channel.execute(&format!("sudo ln -sf {available} {enabled}"))?;
    if !linked.success() {
        return Err(DeployError::Configuration(format!(
            "cannot enable site: {}",
            linked.tail(3)
        )));
    }

    // The stock default site also listens on 80 and would shadow
    // ours.
    channel.execute("sudo rm -f /etc/nginx/sites-enabled/default")?;

    let checked = channel.execute("sudo nginx -t")?;
    if !checked.success() {
        return Err(DeployError::Configuration(format!(
            "nginx rejected the configuration: {}",
            checked.tail(5)
        )));
    }

    let active = channel.execute("systemctl is-active nginx")?;
    let action = if active.success() { "reload" } else { "start" };
    let applied = channel.execute(&format!("sudo systemctl {action} nginx"))?;
    if !applied.success() {
        return Err(DeployError::Configuration(format!(
            "nginx {action} failed: {}",
            applied.tail(5)
        )));
    }

    eprintln!("Proxy routing :{} -> 127.0.0.1:{}", config.listen_port, config.upstream_port);
    Ok(Outcome::Success)
}
