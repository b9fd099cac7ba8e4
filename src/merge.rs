//! Merge-mode orchestration: group quad tiles along one dimension and
//! dispatch one merge job per surviving group.

use crate::config::MergeConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, LocalDispatcher, PbsDispatcher};
use crate::grouper::group_tiles;
use crate::job::{build_merge_job, JobEnv};
use crate::report::BatchReport;
use anyhow::Result;

/// Run the merge batch with the dispatcher implied by the configuration.
pub fn run_merge(config: &MergeConfig) -> Result<BatchReport> {
    let dispatcher: Box<dyn Dispatcher> = if config.pbs {
        Box::new(PbsDispatcher::new(
            config.qsub_script.clone(),
            config.dry_run,
        )?)
    } else {
        Box::new(LocalDispatcher::new(config.dry_run)?)
    };
    run_merge_with(config, dispatcher.as_ref())
}

/// Run the merge batch against an explicit dispatcher.
pub fn run_merge_with(config: &MergeConfig, dispatcher: &dyn Dispatcher) -> Result<BatchReport> {
    let outcome = group_tiles(
        &config.dst_dir,
        &config.tiles,
        config.dimension,
        config.dry_run,
    )?;

    let mut report = BatchReport {
        units_total: outcome.groups.len() + outcome.skipped_small.len(),
        skipped: outcome.skipped_small.len(),
        ..BatchReport::default()
    };
    for tile in &outcome.inconsistent {
        report.record_error(format!(
            "no quad mat files exist for tile {tile} but previous results remain; \
             investigate before rerunning"
        ));
    }

    let env = JobEnv {
        script_dir: config.script_dir.clone(),
        lib_path: config.lib_path.clone(),
    };
    for group in &outcome.groups {
        let job = build_merge_job(&env, &config.dst_dir, group);
        match dispatcher.dispatch(&job)? {
            DispatchOutcome::Submitted | DispatchOutcome::DryRun => report.submitted += 1,
            DispatchOutcome::Failed => report.dispatch_failures += 1,
        }
    }

    report.render_summary();
    Ok(report)
}
