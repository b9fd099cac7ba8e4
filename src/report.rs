//! Batch summary accumulation and the final reconciliation pass.
//!
//! Per-unit problems never abort the batch; they accumulate here and come
//! out in one summary block (and optionally as JSON) once every unit has
//! been decided and dispatched.

use crate::paths::MosaicUnitPaths;
use crate::probe;
use crate::tile::Resolution;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Work units enumerated from the request.
    pub units_total: usize,
    /// Units submitted (or that would be, under dry-run).
    pub submitted: usize,
    /// Units skipped as up to date, unsatisfied, or degenerate.
    pub skipped: usize,
    /// Dispatches that came back nonzero.
    pub dispatch_failures: usize,
    /// Collected per-unit warnings and inconsistencies.
    pub errors: Vec<String>,
    /// Subtile directories to re-check once the batch is done.
    pub check_dirs: BTreeSet<PathBuf>,
    /// Tiles whose subtile directory produced no results on reconciliation.
    pub needs_investigation: Vec<String>,
}

impl BatchReport {
    pub fn record_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Queue a subtile directory for the post-batch reconciliation scan.
    pub fn record_check_dir(&mut self, dir: &Path) {
        self.check_dirs.insert(dir.to_path_buf());
    }

    /// Re-glob each flagged subtile directory for results at the batch
    /// resolution; directories still empty are reported, never retried.
    pub fn reconcile(&mut self, res: Resolution) -> Result<()> {
        info!(
            "checking {} super-tiles for existence of subtile results",
            self.check_dirs.len()
        );
        for dir in &self.check_dirs {
            let tile_name = dir
                .parent()
                .and_then(|parent| parent.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let pattern = MosaicUnitPaths::subtile_result_pattern(&tile_name, res);
            if probe::glob_dir(dir, &pattern)?.is_empty() {
                warn!(
                    "no {res}m results exist in subtile directory for tile {tile_name}: {}",
                    dir.display()
                );
                self.needs_investigation.push(tile_name);
            }
        }
        Ok(())
    }

    /// Final human-readable summary, mirrored in dry-run and real runs.
    pub fn render_summary(&self) {
        info!(
            "batch complete: {} units, {} submitted, {} skipped, {} dispatch failures",
            self.units_total, self.submitted, self.skipped, self.dispatch_failures
        );
        if !self.errors.is_empty() {
            warn!(
                "the following {} units should be investigated and potentially rerun",
                self.errors.len()
            );
            for message in &self.errors {
                warn!("{message}");
            }
        }
        for tile in &self.needs_investigation {
            warn!("tile {tile} has no subtile results; needs investigation");
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileName;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reconcile_flags_empty_subtile_dirs() {
        let root = TempDir::new().unwrap();
        let empty = root.path().join("37_42/subtiles");
        let populated = root.path().join("37_43/subtiles");
        fs::create_dir_all(&empty).unwrap();
        fs::create_dir_all(&populated).unwrap();
        fs::write(populated.join("37_43_0001_2m.mat"), b"").unwrap();

        let mut report = BatchReport::default();
        report.record_check_dir(&empty);
        report.record_check_dir(&populated);
        report.reconcile(Resolution::TwoMeter).unwrap();

        assert_eq!(report.needs_investigation, vec!["37_42".to_string()]);
    }

    #[test]
    fn reconcile_respects_resolution() {
        let root = TempDir::new().unwrap();
        let tile = TileName::parse("37_42").unwrap();
        let dir = root.path().join(tile.base()).join("subtiles");
        fs::create_dir_all(&dir).unwrap();
        // Only 2m results exist; a 10m batch must still flag this tile.
        fs::write(dir.join("37_42_0001_2m.mat"), b"").unwrap();

        let mut report = BatchReport::default();
        report.record_check_dir(&dir);
        report.reconcile(Resolution::TenMeter).unwrap();
        assert_eq!(report.needs_investigation, vec!["37_42".to_string()]);
    }

    #[test]
    fn check_dirs_deduplicate() {
        let mut report = BatchReport::default();
        report.record_check_dir(Path::new("/data/37_42/subtiles"));
        report.record_check_dir(Path::new("/data/37_42/subtiles"));
        report.reconcile(Resolution::TwoMeter).unwrap();
        // Missing directory globs to empty, reported once.
        assert_eq!(report.needs_investigation.len(), 1);
    }
}
