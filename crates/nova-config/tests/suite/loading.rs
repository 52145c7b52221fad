use nova_config::{ConfigError, NovaConfig};
use tempfile::{tempdir, NamedTempFile};

#[test]
fn loads_decompile_tables_from_a_file() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        r#"
[logging]
level = "debug"
json = true
stderr = false
buffer_lines = 50

[decompile]
parallel_units = false

[decompile.structure]
recover_for_loops = false
validate_breaks = true

[decompile.fold]
iteration_cap = 8
comparators = false
string_concat = false
"#,
    )
    .unwrap();

    let config = NovaConfig::load_from_path(file.path()).expect("config should load");

    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(!config.logging.stderr);
    assert_eq!(config.logging.buffer_lines, 50);
    assert!(!config.decompile.parallel_units);
    assert!(!config.decompile.structure.recover_for_loops);
    assert!(config.decompile.structure.validate_breaks);
    assert_eq!(config.decompile.fold.iteration_cap, 8);
    assert!(!config.decompile.fold.comparators);
    assert!(config.decompile.fold.ternaries);
    assert!(!config.decompile.fold.string_concat);
    assert!(config.decompile.fold.nested_conditions);
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nova.toml");

    let err = NovaConfig::load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => {
            assert_eq!(reported, path.display().to_string());
        }
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[test]
fn diagnostics_survive_file_loading() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "[decompile]\nthreds = 2\n").unwrap();

    let (config, diagnostics) =
        NovaConfig::load_from_path_with_diagnostics(file.path()).expect("config should load");

    assert_eq!(diagnostics.unknown_keys, vec!["decompile.threds"]);
    assert_eq!(config.decompile.threads, 0);
}
