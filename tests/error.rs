use ballista::error::DeployError;

#[test]
fn display_validation() {
    let err = DeployError::Validation("port must be 1-65535".into());
    assert_eq!(err.to_string(), "invalid input: port must be 1-65535");
}

#[test]
fn display_connectivity() {
    let err = DeployError::Connectivity("auth failed".into());
    assert_eq!(err.to_string(), "remote connection failed: auth failed");
}

#[test]
fn display_provisioning() {
    let err = DeployError::Provisioning("no package manager".into());
    assert_eq!(err.to_string(), "provisioning failed: no package manager");
}

#[test]
fn display_deployment() {
    let err = DeployError::Deployment("image build failed".into());
    assert_eq!(err.to_string(), "deployment failed: image build failed");
}

#[test]
fn display_configuration() {
    let err = DeployError::Configuration("nginx -t".into());
    assert_eq!(err.to_string(), "proxy configuration rejected: nginx -t");
}

#[test]
fn display_command_not_found() {
    let err = DeployError::CommandNotFound("rsync".into());
    assert_eq!(err.to_string(), "command not found: rsync");
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: DeployError = io_err.into();
    assert!(matches!(err, DeployError::Io(_)));
}

#[test]
fn from_json_error() {
    let json_err = serde_json::from_str::<Vec<u64>>("invalid").unwrap_err();
    let err: DeployError = json_err.into();
    assert!(matches!(err, DeployError::Json(_)));
}

#[test]
fn exit_codes_match_the_cli_contract() {
    assert_eq!(DeployError::Validation("x".into()).exit_code(), 2);
    assert_eq!(DeployError::Connectivity("x".into()).exit_code(), 3);
    assert_eq!(DeployError::Provisioning("x".into()).exit_code(), 4);
    assert_eq!(DeployError::Deployment("x".into()).exit_code(), 4);
    assert_eq!(DeployError::Configuration("x".into()).exit_code(), 5);
    assert_eq!(DeployError::Interrupted.exit_code(), 130);
    assert_eq!(DeployError::Other("x".into()).exit_code(), 1);
    assert_eq!(DeployError::CommandNotFound("x".into()).exit_code(), 1);
}
