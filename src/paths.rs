//! Filesystem layout contract for tile artifacts.
//!
//! All artifact locations derive deterministically from a source root plus a
//! (tile, quadrant, resolution) triple:
//!
//! ```text
//! <root>/<tile>/<tile>[_<quadrant>]_<res>m.mat     mosaic output
//! <root>/<tile>/<tile>[_<quadrant>]_<res>m.fin     mosaic finfile
//! <root>/<tile>/subtiles/                          subtile directory
//! <root>/<tile>/subtiles/<tile>_10000_<res>m.mat   final-index subtile
//! <root>/<tile>/subtiles/<tile>_10000_<res>m.fin   precursor finfile
//! ```
//!
//! Nothing here touches the filesystem; existence and timestamps are the
//! probe's concern.

use crate::tile::{Quadrant, Resolution, TileName};
use std::path::{Path, PathBuf};

/// Every path the mosaic freshness decision observes for one work unit.
#[derive(Debug, Clone)]
pub struct MosaicUnitPaths {
    /// Expected data output (`D_out`).
    pub output: PathBuf,
    /// This unit's own completion marker (`F_out`).
    pub finfile: PathBuf,
    /// Directory holding upstream subtile results.
    pub subtile_dir: PathBuf,
    /// Precursor finfile at the requested resolution.
    pub precursor_res_fin: PathBuf,
    /// Precursor finfile at full (2m) resolution.
    pub precursor_2m_fin: PathBuf,
    /// Final numbered subtile output, the fallback completion signal.
    pub precursor_index_mat: PathBuf,
}

impl MosaicUnitPaths {
    pub fn new(
        src_dir: &Path,
        tile: &TileName,
        quadrant: Option<Quadrant>,
        res: Resolution,
    ) -> MosaicUnitPaths {
        let base = tile.base();
        let tile_dir = src_dir.join(&base);
        let output_name = output_file_name(tile, quadrant, res);
        let fin_name = output_name.replace(".mat", ".fin");
        let subtile_dir = tile_dir.join("subtiles");
        let index_stem = format!("{base}_10000_{res}m");
        MosaicUnitPaths {
            output: tile_dir.join(&output_name),
            finfile: tile_dir.join(fin_name),
            precursor_res_fin: subtile_dir.join(format!("{index_stem}.fin")),
            precursor_2m_fin: subtile_dir.join(format!("{base}_10000_2m.fin")),
            precursor_index_mat: subtile_dir.join(format!("{index_stem}.mat")),
            subtile_dir,
        }
    }

    /// File-name glob matching the output and every sibling partial artifact
    /// sharing its stem, used when clearing stale results.
    pub fn stale_output_pattern(&self) -> String {
        let name = file_name_lossy(&self.output);
        format!("{}*", name.trim_end_matches(".mat"))
    }

    /// Directory containing the output artifact.
    pub fn tile_dir(&self) -> &Path {
        self.output.parent().unwrap_or_else(|| Path::new("."))
    }

    /// File-name glob for subtile results at the given resolution, used by
    /// the reconciliation pass.
    pub fn subtile_result_pattern(tile_dir_name: &str, res: Resolution) -> String {
        format!("{tile_dir_name}_*{res}m.mat")
    }
}

/// Output artifact file name for a mosaic unit.
pub fn output_file_name(tile: &TileName, quadrant: Option<Quadrant>, res: Resolution) -> String {
    match quadrant {
        Some(quad) => format!("{}_{}_{}m.mat", tile.base(), quad, res),
        None => format!("{}_{}m.mat", tile.base(), res),
    }
}

/// Quadrant-level 2m precursor artifact checked by the merge grouper.
pub fn merge_quad_mat(dst_dir: &Path, tile: &TileName, quadrant: Quadrant) -> PathBuf {
    dst_dir
        .join(tile.base())
        .join(format!("{}_{}_2m.mat", tile.base(), quadrant))
}

/// File-name globs for previous-version merge outputs under a tile directory.
pub fn legacy_merge_patterns(tile: &TileName) -> [String; 2] {
    let base = tile.base();
    [format!("{base}*2m*.tif"), format!("{base}*2m*meta.txt")]
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
