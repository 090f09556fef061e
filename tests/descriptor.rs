use std::fs;

use ballista::descriptor::{self, DeployMode, Target};

fn repo_with(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

const COMPOSE: &str = "services:\n  web:\n    build: .\n    ports:\n      - \"8080:8080\"\n";

#[test]
fn every_compose_filename_variant_is_recognized() {
    for name in [
        "docker-compose.yml",
        "docker-compose.yaml",
        "compose.yml",
        "compose.yaml",
    ] {
        let dir = repo_with(&[(name, COMPOSE)]);
        assert_eq!(
            descriptor::detect_mode(dir.path()).unwrap(),
            DeployMode::Compose,
            "variant: {name}"
        );
    }
}

#[test]
fn precedence_is_deterministic_across_runs() {
    let dir = repo_with(&[("Dockerfile", "FROM scratch\n"), ("compose.yaml", COMPOSE)]);

    for _ in 0..5 {
        assert_eq!(
            descriptor::detect_mode(dir.path()).unwrap(),
            DeployMode::Compose
        );
    }
}

#[test]
fn target_resolution_derives_everything_from_the_checkout() {
    let parent = tempfile::tempdir().unwrap();
    let checkout = parent.path().join("My_Web.App");
    fs::create_dir(&checkout).unwrap();
    fs::write(checkout.join("Dockerfile"), "FROM scratch\n").unwrap();

    let target = Target::resolve(&checkout).unwrap();

    assert_eq!(target.mode, DeployMode::Dockerfile);
    assert_eq!(target.app_name, "my-web-app");
    assert_eq!(target.remote_dir, "/opt/app_deploy");
}

#[test]
fn a_repo_without_descriptors_cannot_deploy() {
    let dir = repo_with(&[("README.md", "# app\n"), ("main.py", "print('hi')\n")]);

    let err = descriptor::detect_mode(dir.path()).unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("descriptor"));
}

#[test]
fn generated_compose_descriptor_is_accepted() {
    let service = docker_compose_types::Service {
        image: Some("nginx:alpine".to_string()),
        ..Default::default()
    };
    let mut services = indexmap::IndexMap::new();
    services.insert("web".to_string(), Some(service));
    let compose = docker_compose_types::Compose {
        services: docker_compose_types::Services(services),
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let yaml = serde_yaml::to_string(&compose).unwrap();
    fs::write(dir.path().join("docker-compose.yml"), yaml).unwrap();

    assert_eq!(
        descriptor::detect_mode(dir.path()).unwrap(),
        DeployMode::Compose
    );
}

#[test]
fn compose_file_must_declare_services() {
    let dir = repo_with(&[("docker-compose.yml", "version: \"3\"\nservices: {}\n")]);

    assert!(descriptor::detect_mode(dir.path()).is_err());
}

#[test]
fn dockerfile_in_a_subdirectory_does_not_count() {
    let dir = repo_with(&[]);
    let sub = dir.path().join("docker");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("Dockerfile"), "FROM scratch\n").unwrap();

    assert!(descriptor::detect_mode(dir.path()).is_err());
}
