//! Shared test infrastructure: artifact tree helpers and a recording
//! dispatcher so batch runs can be driven without spawning anything.

use anyhow::Result;
use mosaic_batch::config::{MosaicConfig, TileDefSource};
use mosaic_batch::dispatch::{DispatchOutcome, Dispatcher};
use mosaic_batch::freshness::PrecursorPolicy;
use mosaic_batch::job::JobDescriptor;
use mosaic_batch::tile::{Resolution, TileName};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Captures every dispatched job instead of executing it.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub jobs: RefCell<Vec<JobDescriptor>>,
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, job: &JobDescriptor) -> Result<DispatchOutcome> {
        self.jobs.borrow_mut().push(job.clone());
        Ok(DispatchOutcome::Submitted)
    }
}

impl RecordingDispatcher {
    #[allow(dead_code)]
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.borrow().iter().map(|j| j.name.clone()).collect()
    }
}

/// Create an empty marker file, creating parent directories as needed.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

/// Create a file pinned to an explicit mtime so staleness comparisons are
/// deterministic regardless of test execution speed.
#[allow(dead_code)]
pub fn touch_at(path: &Path, epoch_secs: u64) {
    touch(path);
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(epoch_secs);
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_times(fs::FileTimes::new().set_modified(mtime))
        .unwrap();
}

/// A mosaic configuration over a temp tree, bypassing CLI parsing. The
/// script dir gets a tile definition file so approved units can build jobs.
#[allow(dead_code)]
pub fn mosaic_config(src_dir: &Path, script_dir: &Path, tiles: &[&str]) -> MosaicConfig {
    touch(&script_dir.join("Tile_Defs.mat"));
    MosaicConfig {
        src_dir: src_dir.to_path_buf(),
        tiles: tiles
            .iter()
            .map(|raw| TileName::parse(raw).unwrap())
            .collect(),
        resolution: Resolution::TwoMeter,
        script_dir: script_dir.to_path_buf(),
        lib_path: script_dir.to_path_buf(),
        tile_def: TileDefSource::Fixed("Tile_Defs.mat".to_string()),
        version: "Demo|1.0".to_string(),
        quads: false,
        policy: PrecursorPolicy::Strict,
        require_mst_finfiles: false,
        pbs: false,
        qsub_script: script_dir.join("qsub_mosaicSubTiles.sh"),
        dry_run: false,
    }
}
