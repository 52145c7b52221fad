use nova_config::{ConfigValidationError, ConfigWarning, NovaConfig};

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[logging]
levle = "debug"

[decompile.fold]
iteration_capp = 4
"#;

    let (_config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["decompile.fold.iteration_capp", "logging.levle", "typo"]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn zero_iteration_cap_is_an_error_and_clamped() {
    let text = r#"
[decompile.fold]
iteration_cap = 0
"#;

    let (config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.errors,
        vec![ConfigValidationError::InvalidValue {
            toml_path: "decompile.fold.iteration_cap".to_string(),
            message: "must be >= 1; using 1".to_string(),
        }]
    );
    assert!(!diagnostics.is_ok());
    assert_eq!(config.decompile.fold.iteration_cap, 1);
}

#[test]
fn threads_without_parallelism_is_a_warning() {
    let text = r#"
[decompile]
parallel_units = false
threads = 4
"#;

    let (config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(diagnostics.is_ok());
    assert!(matches!(
        diagnostics.warnings.as_slice(),
        [ConfigWarning::InvalidValue { toml_path, .. }] if toml_path == "decompile.threads"
    ));
    assert_eq!(config.decompile.threads, 4);
}

#[test]
fn invalid_log_level_is_a_warning() {
    let text = r#"
[logging]
level = "nova=[[["
"#;

    let (_config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(matches!(
        diagnostics.warnings.as_slice(),
        [ConfigWarning::LoggingLevelInvalid { .. }]
    ));
}

#[test]
fn type_errors_fail_to_load() {
    let text = r#"
[decompile.fold]
enabled = "yes"
"#;

    let err = NovaConfig::load_from_str_with_diagnostics(text).unwrap_err();
    assert!(err.to_string().starts_with("failed to parse toml config"));
}
