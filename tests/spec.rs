use ballista::DeploySpec;
use ballista::spec::{is_dotted_quad, is_valid_port, is_valid_repo_url};

#[test]
fn accepts_common_repo_url_shapes() {
    assert!(is_valid_repo_url("https://github.com/acme/webapp.git"));
    assert!(is_valid_repo_url("http://git.internal/team/app"));
    assert!(is_valid_repo_url("ssh://git@github.com/acme/webapp.git"));
    assert!(is_valid_repo_url("git@github.com:acme/webapp.git"));
}

#[test]
fn rejects_malformed_repo_urls() {
    assert!(!is_valid_repo_url(""));
    assert!(!is_valid_repo_url("not a url"));
    assert!(!is_valid_repo_url("https://"));
    assert!(!is_valid_repo_url("https://hostonly"));
    assert!(!is_valid_repo_url("git@github.com"));
    assert!(!is_valid_repo_url("@host:path"));
}

#[test]
fn dotted_quad_validation() {
    assert!(is_dotted_quad("203.0.113.10"));
    assert!(is_dotted_quad("10.0.0.1"));
    assert!(is_dotted_quad("255.255.255.255"));

    assert!(!is_dotted_quad("256.0.0.1"));
    assert!(!is_dotted_quad("1.2.3"));
    assert!(!is_dotted_quad("1.2.3.4.5"));
    assert!(!is_dotted_quad("example.com"));
    assert!(!is_dotted_quad(""));
}

#[test]
fn port_range() {
    assert!(is_valid_port(1));
    assert!(is_valid_port(8080));
    assert!(is_valid_port(65535));
    assert!(!is_valid_port(0));
}

#[test]
fn validate_accepts_a_complete_spec() {
    let key = tempfile::NamedTempFile::new().unwrap();
    let key_path = key.path().to_string_lossy().to_string();

    let spec = DeploySpec::new(
        "https://example.com/app.git",
        "deploy",
        "203.0.113.10",
        &key_path,
        8080,
    );

    assert!(spec.validate().is_ok());
}

#[test]
fn validate_rejects_missing_key_with_the_validation_status() {
    let spec = DeploySpec::new(
        "https://example.com/app.git",
        "deploy",
        "203.0.113.10",
        "/no/such/key",
        8080,
    );

    let err = spec.validate().unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn validate_rejects_hostname_addresses() {
    let key = tempfile::NamedTempFile::new().unwrap();
    let key_path = key.path().to_string_lossy().to_string();

    let spec = DeploySpec::new(
        "https://example.com/app.git",
        "deploy",
        "server.example.com",
        &key_path,
        8080,
    );

    let err = spec.validate().unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn validate_rejects_empty_user_and_branch() {
    let key = tempfile::NamedTempFile::new().unwrap();
    let key_path = key.path().to_string_lossy().to_string();

    let no_user =
        DeploySpec::new("https://example.com/app.git", "", "203.0.113.10", &key_path, 80);
    assert!(no_user.validate().is_err());

    let no_branch =
        DeploySpec::new("https://example.com/app.git", "u", "203.0.113.10", &key_path, 80)
            .branch("");
    assert!(no_branch.validate().is_err());
}
