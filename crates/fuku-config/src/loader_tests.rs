use fuku_core::Command;
use tempfile::tempdir;

use super::*;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("fuku.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_a_service_with_defaults() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.web]
        command = ["node", "server.js"]
        "#,
    );
    let (services, profiles) = load(&path).unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "web");
    assert_eq!(services[0].command, Command::Argv(vec!["node".into(), "server.js".into()]));
    assert_eq!(services[0].working_dir, dir.path());
    assert_eq!(services[0].shutdown_grace_secs, 10);
    assert_eq!(services[0].readiness_deadline_secs, 60);

    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "default");
    assert_eq!(profiles[0].services, vec!["web".to_string()]);
    assert!(profiles[0].require_all_ready);
}

#[test]
fn explicit_working_dir_is_not_overridden() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.web]
        command = "npm start"
        working_dir = "/srv/web"
        "#,
    );
    let (services, _) = load(&path).unwrap();
    assert_eq!(services[0].working_dir, std::path::Path::new("/srv/web"));
}

#[test]
fn declaration_order_is_preserved() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.c]
        command = "true"
        [services.a]
        command = "true"
        [services.b]
        command = "true"
        "#,
    );
    let (services, _) = load(&path).unwrap();
    let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[test]
fn explicit_profiles_are_used_verbatim() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.web]
        command = "true"
        [services.db]
        command = "true"

        [profiles.web-only]
        services = ["web"]
        require_all_ready = false
        "#,
    );
    let (_, profiles) = load(&path).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "web-only");
    assert_eq!(profiles[0].services, vec!["web".to_string()]);
    assert!(!profiles[0].require_all_ready);
}

#[test]
fn readiness_deadline_secs_can_be_overridden() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.web]
        command = "true"
        readiness_deadline_secs = 5
        "#,
    );
    let (services, _) = load(&path).unwrap();
    assert_eq!(services[0].readiness_deadline_secs, 5);
}

#[test]
fn a_missing_file_is_an_io_error() {
    let err = load("/nonexistent/fuku.toml").unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "not [ valid toml");
    let err = load(&path).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
}

#[test]
fn a_readiness_probe_round_trips_from_toml() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services.web]
        command = "true"
        [services.web.readiness]
        kind = "tcp"
        host = "127.0.0.1"
        port = 8080
        "#,
    );
    let (services, _) = load(&path).unwrap();
    assert_eq!(
        services[0].readiness,
        Some(fuku_core::ReadinessProbe::Tcp { host: "127.0.0.1".into(), port: 8080 })
    );
}
