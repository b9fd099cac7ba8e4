//! Job dispatch: cluster submission or direct local execution.
//!
//! Dispatchers consume a [`JobDescriptor`] and nothing else; they own all
//! knowledge of command syntax. Commands are spawned as argv vectors, never
//! through a shell, so paths and tile lists require no quoting. Under dry-run
//! a dispatcher logs exactly what it would run and spawns nothing.

use crate::job::{JobDescriptor, JobKind, MergeJob, MosaicJob};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{info, warn};

/// What happened to a dispatched job. Failures are per-unit: the batch
/// continues and the summary reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Submitted,
    DryRun,
    Failed,
}

pub trait Dispatcher {
    fn dispatch(&self, job: &JobDescriptor) -> Result<DispatchOutcome>;
}

/// Submits jobs to a PBS scheduler via `qsub`.
pub struct PbsDispatcher {
    qsub_script: PathBuf,
    dry_run: bool,
}

impl PbsDispatcher {
    /// `qsub` must be resolvable up front for a real run; dry-run skips the
    /// lookup so it works anywhere.
    pub fn new(qsub_script: PathBuf, dry_run: bool) -> Result<PbsDispatcher> {
        if !dry_run {
            which::which("qsub").context("qsub not found on PATH")?;
        }
        Ok(PbsDispatcher {
            qsub_script,
            dry_run,
        })
    }

    fn qsub_args(&self, job: &JobDescriptor) -> Vec<String> {
        let joined = job
            .params()
            .iter()
            .map(|p| format!("{}={}", p.key, p.value))
            .collect::<Vec<_>>()
            .join(",");
        vec![
            "-N".to_string(),
            job.name.clone(),
            "-v".to_string(),
            joined,
            self.qsub_script.display().to_string(),
        ]
    }
}

impl Dispatcher for PbsDispatcher {
    fn dispatch(&self, job: &JobDescriptor) -> Result<DispatchOutcome> {
        let args = self.qsub_args(job);
        info!("qsub {}", args.join(" "));
        if self.dry_run {
            return Ok(DispatchOutcome::DryRun);
        }
        let status = Command::new("qsub")
            .args(&args)
            .status()
            .context("spawn qsub")?;
        if status.success() {
            Ok(DispatchOutcome::Submitted)
        } else {
            warn!("qsub for job {} exited with {status}", job.name);
            Ok(DispatchOutcome::Failed)
        }
    }
}

/// Runs jobs synchronously through the external numeric tool, blocking the
/// batch loop until each returns.
pub struct LocalDispatcher {
    dry_run: bool,
}

impl LocalDispatcher {
    pub fn new(dry_run: bool) -> Result<LocalDispatcher> {
        if !dry_run {
            which::which("matlab").context("matlab not found on PATH")?;
        }
        Ok(LocalDispatcher { dry_run })
    }

    fn program(job: &JobDescriptor) -> String {
        match &job.kind {
            JobKind::Mosaic(job) => mosaic_program(job),
            JobKind::Merge(job) => merge_program(job),
        }
    }
}

impl Dispatcher for LocalDispatcher {
    fn dispatch(&self, job: &JobDescriptor) -> Result<DispatchOutcome> {
        let program = Self::program(job);
        info!("matlab -nojvm -nodisplay -nosplash -r {program}");
        if self.dry_run {
            return Ok(DispatchOutcome::DryRun);
        }
        let status = Command::new("matlab")
            .args(["-nojvm", "-nodisplay", "-nosplash", "-r", &program])
            .status()
            .context("spawn matlab")?;
        if status.success() {
            Ok(DispatchOutcome::Submitted)
        } else {
            warn!("local run for job {} exited with {status}", job.name);
            Ok(DispatchOutcome::Failed)
        }
    }
}

/// The `-r` program for one mosaic unit. Extent and projection come from the
/// tile definition at run time, inside the tool.
fn mosaic_program(job: &MosaicJob) -> String {
    let quad_extent_arg = match &job.quadrant {
        Some(quad) => format!(",'quadrant','{quad}'"),
        None => String::new(),
    };
    let quad_call_arg = match &job.quadrant {
        Some(quad) => format!("'quadrant','{quad}',"),
        None => String::new(),
    };
    format!(
        "try; addpath('{script}'); addpath('{lib}'); \
         [x0,x1,y0,y1]=getTileExtents('{tile}','{tile_def}'{quad_extent_arg}); \
         projstr=getTileProjection('{tile_def}'); \
         {function}('{subtiles}',{res},'{output}','projection',projstr,{quad_call_arg}\
         'version','{version}','extent',[x0,x1,y0,y1]); \
         catch e; disp(getReport(e)); exit(1); end; exit(0);",
        script = job.script_dir.display(),
        lib = job.lib_path.display(),
        tile = job.tile,
        tile_def = job.tile_def,
        function = job.function,
        subtiles = job.subtile_dir.display(),
        res = job.resolution,
        output = job.output.display(),
        version = job.version,
    )
}

/// The `-r` program for one merge group.
fn merge_program(job: &MergeJob) -> String {
    let cell_list = job.tile_list.replace(';', "','");
    format!(
        "addpath('{script}'); addpath('{lib}'); \
         batch_batchMergeQuadTileBuffer('{dst}',{{'{cell_list}'}}); exit",
        script = job.script_dir.display(),
        lib = job.lib_path.display(),
        dst = job.dst_dir.display(),
    )
}
