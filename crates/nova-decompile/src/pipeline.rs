//! Per-unit driver: structure, fold, annotate.

use nova_config::{DecompileConfig, DECOMPILE_TARGET};
use nova_decompile_ast::{BreakRegistry, StatementBlock, TypeResolver};
use nova_flow::BlockGraph;
use rayon::prelude::*;

use crate::diagnostics::Diagnostic;
use crate::error::DecompileError;
use crate::fold::fold;
use crate::infer::infer_types;
use crate::structure::structure;

/// One method body awaiting decompilation.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub graph: BlockGraph,
}

impl Unit {
    pub fn new(name: impl Into<String>, graph: BlockGraph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecompiledUnit {
    pub name: String,
    pub body: StatementBlock,
    pub registry: BreakRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn decompile_unit(
    unit: &Unit,
    resolver: &dyn TypeResolver,
    config: &DecompileConfig,
) -> Result<DecompiledUnit, DecompileError> {
    let structured =
        structure(&unit.graph, &config.structure).map_err(|source| DecompileError {
            unit: unit.name.clone(),
            source,
        })?;

    let mut diagnostics = structured.diagnostics;
    let folded = fold(structured.body, &config.fold);
    diagnostics.extend(folded.diagnostics);
    let inferred = infer_types(folded.body, resolver);
    diagnostics.extend(inferred.diagnostics);

    tracing::debug!(
        target: DECOMPILE_TARGET,
        unit = %unit.name,
        statements = inferred.body.len(),
        fold_passes = folded.passes,
        diagnostics = diagnostics.len(),
        "decompiled unit"
    );
    Ok(DecompiledUnit {
        name: unit.name.clone(),
        body: inferred.body,
        registry: structured.registry,
        diagnostics,
    })
}

/// Decompiles every unit, in input order. A unit that fails does not stop
/// the others; its error takes its place in the output.
pub fn decompile_units(
    units: &[Unit],
    resolver: &(dyn TypeResolver + Sync),
    config: &DecompileConfig,
) -> Vec<Result<DecompiledUnit, DecompileError>> {
    let outcomes = if config.parallel_units {
        decompile_parallel(units, resolver, config)
    } else {
        units
            .iter()
            .map(|unit| decompile_unit(unit, resolver, config))
            .collect()
    };

    let mut failed = 0usize;
    for outcome in &outcomes {
        if let Err(err) = outcome {
            failed += 1;
            tracing::warn!(
                target: DECOMPILE_TARGET,
                unit = %err.unit,
                error = %err.source,
                "unit failed to decompile"
            );
        }
    }
    tracing::info!(
        target: DECOMPILE_TARGET,
        units = units.len(),
        failed,
        parallel = config.parallel_units,
        "decompilation finished"
    );
    outcomes
}

fn decompile_parallel(
    units: &[Unit],
    resolver: &(dyn TypeResolver + Sync),
    config: &DecompileConfig,
) -> Vec<Result<DecompiledUnit, DecompileError>> {
    let run = || {
        units
            .par_iter()
            .map(|unit| decompile_unit(unit, resolver, config))
            .collect::<Vec<_>>()
    };
    if config.threads == 0 {
        return run();
    }

    // Thread creation can fail under tight process limits; shrink the pool
    // and finally run inline rather than giving up.
    let mut threads = config.threads;
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("nova-decompile-{idx}"))
            .build()
        {
            Ok(pool) => return pool.install(run),
            Err(_) if threads > 1 => threads = (threads / 2).max(1),
            Err(err) => {
                tracing::warn!(
                    target: DECOMPILE_TARGET,
                    error = %err,
                    "could not start decompile workers; running inline"
                );
                return units
                    .iter()
                    .map(|unit| decompile_unit(unit, resolver, config))
                    .collect();
            }
        }
    }
}
