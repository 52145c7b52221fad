use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, NovaConfig};

impl NovaConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_logging(self, &mut out);
        validate_decompile(self, &mut out);

        out
    }
}

fn validate_logging(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }

    if config.logging.buffer_lines == 0 {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "logging.buffer_lines".to_string(),
            message: "must be >= 1; using 1".to_string(),
        });
    }
}

fn validate_decompile(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let decompile = &config.decompile;

    if decompile.fold.iteration_cap == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "decompile.fold.iteration_cap".to_string(),
            message: "must be >= 1; using 1".to_string(),
        });
    }

    if !decompile.parallel_units && decompile.threads > 0 {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "decompile.threads".to_string(),
            message: "ignored because decompile.parallel_units is false".to_string(),
        });
    }
}
