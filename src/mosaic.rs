//! Mosaic-mode orchestration: one decision and at most one dispatch per
//! (tile, quadrant) unit, in deterministic sorted order, followed by the
//! reconciliation pass.

use crate::config::MosaicConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, LocalDispatcher, PbsDispatcher};
use crate::freshness::{
    decide, ArtifactObservation, Decision, PrecursorPolicy, SkipReason, UnitError,
};
use crate::job::{build_mosaic_job, JobEnv};
use crate::paths::{output_file_name, MosaicUnitPaths};
use crate::probe;
use crate::report::BatchReport;
use crate::tile::{Quadrant, TileName};
use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, info, warn};

/// Run the mosaic batch with the dispatcher implied by the configuration.
pub fn run_mosaic(config: &MosaicConfig) -> Result<BatchReport> {
    let dispatcher: Box<dyn Dispatcher> = if config.pbs {
        Box::new(PbsDispatcher::new(
            config.qsub_script.clone(),
            config.dry_run,
        )?)
    } else {
        Box::new(LocalDispatcher::new(config.dry_run)?)
    };
    run_mosaic_with(config, dispatcher.as_ref())
}

/// Run the mosaic batch against an explicit dispatcher (tests inject a
/// recording one here).
pub fn run_mosaic_with(config: &MosaicConfig, dispatcher: &dyn Dispatcher) -> Result<BatchReport> {
    let units = enumerate_units(config);
    info!("{} tasks found", units.len());

    let env = JobEnv {
        script_dir: config.script_dir.clone(),
        lib_path: config.lib_path.clone(),
    };
    let mut report = BatchReport {
        units_total: units.len(),
        ..BatchReport::default()
    };

    for (tile, quadrant) in &units {
        let paths = MosaicUnitPaths::new(&config.src_dir, tile, *quadrant, config.resolution);
        let unit_name = output_file_name(tile, *quadrant, config.resolution);
        let obs = ArtifactObservation::capture(&paths);
        let decision = decide(&obs, config.policy, config.require_mst_finfiles);
        debug!("{unit_name}: {decision}");

        match decision {
            Decision::Error(UnitError::MissingSubtileDir) => {
                let message = format!(
                    "subtile directory ({}) does not exist, skipping {unit_name}",
                    paths.subtile_dir.display()
                );
                warn!("{message}");
                report.record_error(message);
                report.skipped += 1;
            }
            Decision::Skip(SkipReason::MissingPrecursor {
                final_index_present,
            }) => {
                info!(
                    "BST finfile ({}) does not exist, skipping {unit_name}",
                    paths.precursor_res_fin.display()
                );
                if final_index_present {
                    info!(
                        "(the 10,000-th subtile exists; pass --relax-bst-finfile-req \
                         to mosaic this tile anyway)"
                    );
                }
                report.record_error(format!("missing BST finfile for {unit_name}"));
                report.skipped += 1;
            }
            Decision::Skip(SkipReason::OutputExists) => {
                info!("output exists, skipping {unit_name}");
                report.skipped += 1;
            }
            Decision::Skip(SkipReason::FinfilePresent) => {
                info!("finfile exists, skipping {unit_name}");
                report.skipped += 1;
            }
            Decision::Error(UnitError::FinfileWithoutOutput) => {
                let message = format!(
                    "MST finfile exists ({}) but expected output does not exist ({}) for {unit_name}",
                    paths.finfile.display(),
                    paths.output.display()
                );
                warn!("{message}");
                report.record_error(message);
                report.record_check_dir(&paths.subtile_dir);
                report.skipped += 1;
            }
            Decision::Run | Decision::CleanThenRun => {
                if config.policy == PrecursorPolicy::Relax
                    && obs.precursor_res_fin.is_none()
                    && obs.precursor_2m_fin.is_none()
                {
                    warn!(
                        "BST finfile does not exist for {unit_name}, but the \
                         10,000-th subtile exists so it will run"
                    );
                }
                if decision == Decision::CleanThenRun {
                    clean_stale_outputs(&paths, config.dry_run)?;
                }
                let tile_def = config.tile_def_for(tile)?;
                let job = build_mosaic_job(
                    &env,
                    tile,
                    *quadrant,
                    config.resolution,
                    &paths.subtile_dir,
                    &paths.output,
                    &paths.finfile,
                    &tile_def,
                    &config.version,
                );
                match dispatcher.dispatch(&job)? {
                    DispatchOutcome::Submitted | DispatchOutcome::DryRun => report.submitted += 1,
                    DispatchOutcome::Failed => report.dispatch_failures += 1,
                }
            }
        }
    }

    report.reconcile(config.resolution)?;
    report.render_summary();
    Ok(report)
}

fn enumerate_units(config: &MosaicConfig) -> Vec<(&TileName, Option<Quadrant>)> {
    let mut units = Vec::new();
    for tile in &config.tiles {
        if config.quads {
            for quad in Quadrant::ALL {
                units.push((tile, Some(quad)));
            }
        } else {
            units.push((tile, None));
        }
    }
    units
}

/// Delete partial results sharing the output's stem before a rerun. Dry-run
/// emits the same log line and leaves everything in place.
fn clean_stale_outputs(paths: &MosaicUnitPaths, dry_run: bool) -> Result<()> {
    let pattern = paths.stale_output_pattern();
    let stale = probe::glob_dir(paths.tile_dir(), &pattern)?;
    if stale.is_empty() {
        return Ok(());
    }
    let prefix = if dry_run { "(dryrun) " } else { "" };
    info!("{prefix}removing old MST results matching {pattern}");
    for old in stale {
        if !dry_run {
            fs::remove_file(&old).with_context(|| format!("remove {}", old.display()))?;
        }
    }
    Ok(())
}
