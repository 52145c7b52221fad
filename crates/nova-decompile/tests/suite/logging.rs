use nova_config::{init_tracing, DecompileConfig, LoggingConfig};
use nova_decompile::{decompile_units, Unit};
use nova_decompile_ast::DescriptorResolver;

use super::fixtures::{blocks, call};

#[test]
fn pipeline_events_reach_the_log_buffer() {
    let logging = LoggingConfig {
        level: "nova.decompile=debug".to_owned(),
        stderr: false,
        ..LoggingConfig::default()
    };
    let buffer = init_tracing(&logging);

    let (mut builder, bb) = blocks(1);
    builder.push_statement(bb[0], call("a"));
    let units = vec![Unit::new("logged_unit", builder.build().unwrap())];
    let config = DecompileConfig {
        parallel_units: false,
        ..DecompileConfig::default()
    };
    let results = decompile_units(&units, &DescriptorResolver, &config);
    assert!(results[0].is_ok());

    let lines = buffer.last_lines(logging.buffer_lines);
    assert!(
        lines
            .iter()
            .any(|line| line.contains("decompiled unit") && line.contains("logged_unit")),
        "missing unit event in {lines:#?}"
    );
    assert!(lines.iter().any(|line| line.contains("decompilation finished")));
}
