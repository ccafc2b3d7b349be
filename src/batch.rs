//! Parallel analysis of independent compilation units.
//!
//! Units share nothing but the read-only symbol oracle and config, so each
//! is analyzed on its own worker. Results come back in input order.

use std::thread;

use crossbeam_channel::unbounded;

use crate::ast::CompilationUnit;
use crate::config::AnalyzerConfig;
use crate::diagnostics::CompileError;
use crate::typeck::symbols::TypeOracle;
use crate::typeck::{analyze_unit, UnitAnalysis};

pub fn analyze_units<O: TypeOracle + Sync>(
    units: &[CompilationUnit],
    oracle: &O,
    config: &AnalyzerConfig,
) -> Vec<Result<UnitAnalysis, CompileError>> {
    if units.is_empty() {
        return Vec::new();
    }
    let workers = config.worker_threads().min(units.len());
    tracing::debug!(units = units.len(), workers, "starting batch analysis");

    let (job_tx, job_rx) = unbounded::<usize>();
    let (result_tx, result_rx) = unbounded();
    for index in 0..units.len() {
        // The receiver is alive until the scope below ends.
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for index in job_rx.iter() {
                    let unit = &units[index];
                    let span = tracing::debug_span!("unit", worker, name = %unit.name);
                    let _guard = span.enter();
                    let result = analyze_unit(unit, oracle, config);
                    if let Err(err) = &result {
                        tracing::warn!(unit = %unit.name, kind = err.kind(), "analysis failed: {err}");
                    }
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Option<Result<UnitAnalysis, CompileError>>> = (0..units.len()).map(|_| None).collect();
    for (index, result) in result_rx.iter() {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}
