use nova_config::StructureConfig;
use nova_decompile::{structure, StructureError};
use pretty_assertions::assert_eq;

use super::fixtures::{blocks, call, checked, goto, render};

#[test]
fn handler_with_several_types_becomes_multi_catch() {
    let (mut builder, bb) = blocks(3);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], goto(bb[2]));
    builder.push_statement(bb[1], call("b"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.push_statement(bb[2], call("c"));
    builder.add_handler(bb[0], bb[1], bb[1], Some("java/io/IOException"));
    builder.add_handler(bb[0], bb[1], bb[1], Some("java/lang/IllegalStateException"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "try {\n    Log.a();\n} catch (java.io.IOException | java.lang.IllegalStateException) {\n    Log.b();\n}\nLog.c();\n"
    );
}

#[test]
fn catch_all_handler_catches_throwable() {
    let (mut builder, bb) = blocks(3);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], goto(bb[2]));
    builder.push_statement(bb[1], call("cleanup"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.add_handler(bb[0], bb[1], bb[1], None);
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "try {\n    Log.a();\n} catch (java.lang.Throwable) {\n    Log.cleanup();\n}\n"
    );
}

#[test]
fn partially_overlapping_ranges_are_rejected() {
    let (mut builder, bb) = blocks(6);
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.set_terminator(bb[2], goto(bb[5]));
    builder.set_terminator(bb[3], goto(bb[5]));
    builder.set_terminator(bb[4], goto(bb[5]));
    builder.add_handler(bb[0], bb[2], bb[3], None);
    builder.add_handler(bb[1], bb[3], bb[4], None);
    let graph = builder.build().unwrap();

    let err = structure(&graph, &StructureConfig::default()).unwrap_err();
    assert_eq!(err, StructureError::OverlappingHandlers { block: bb[1] });
}

#[test]
fn clauses_follow_table_order() {
    let (mut builder, bb) = blocks(5);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], goto(bb[4]));
    for (block, name) in [(bb[1], "h1"), (bb[2], "h2"), (bb[3], "h3")] {
        builder.push_statement(block, call(name));
        builder.set_terminator(block, goto(bb[4]));
    }
    builder.push_statement(bb[4], call("c"));
    builder.add_handler(bb[0], bb[1], bb[1], Some("java/io/IOException"));
    builder.add_handler(bb[0], bb[1], bb[2], Some("java/lang/RuntimeException"));
    builder.add_handler(bb[0], bb[1], bb[3], Some("java/lang/Exception"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "try {\n    Log.a();\n} catch (java.io.IOException) {\n    Log.h1();\n} catch (java.lang.RuntimeException) {\n    Log.h2();\n} catch (java.lang.Exception) {\n    Log.h3();\n}\nLog.c();\n"
    );
}

#[test]
fn handler_resuming_after_another_is_rejected() {
    let (mut builder, bb) = blocks(4);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], goto(bb[3]));
    builder.push_statement(bb[1], call("h1"));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.push_statement(bb[2], call("h2"));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.push_statement(bb[3], call("c"));
    builder.add_handler(bb[0], bb[1], bb[1], Some("java/io/IOException"));
    builder.add_handler(bb[0], bb[1], bb[2], Some("java/lang/RuntimeException"));
    builder.add_handler(bb[0], bb[1], bb[1], Some("java/lang/Exception"));
    let graph = builder.build().unwrap();

    let err = structure(&graph, &checked()).unwrap_err();
    assert_eq!(err, StructureError::InterleavedHandlers { block: bb[1] });
    assert_eq!(err.block(), Some(bb[1]));
}

#[test]
fn catch_all_rows_resuming_after_another_handler_are_rejected() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], goto(bb[3]));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.add_handler(bb[0], bb[1], bb[1], None);
    builder.add_handler(bb[0], bb[1], bb[2], Some("java/io/IOException"));
    builder.add_handler(bb[0], bb[1], bb[1], None);
    let graph = builder.build().unwrap();

    let err = structure(&graph, &checked()).unwrap_err();
    assert_eq!(err, StructureError::InterleavedHandlers { block: bb[1] });
}
