//! Structured job descriptors for approved work units.
//!
//! A descriptor is an ordered list of named parameters, enough for a
//! dispatcher to format either a direct invocation or a scheduler submission
//! with identical inputs. Building one performs no I/O, so the same unit
//! always yields a byte-identical descriptor.

use crate::grouper::MergeGroup;
use crate::tile::{Quadrant, Resolution, TileName};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A single named job parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobParam {
    pub key: &'static str,
    pub value: String,
}

fn param(key: &'static str, value: impl Into<String>) -> JobParam {
    JobParam {
        key,
        value: value.into(),
    }
}

/// Typed payload for the two kinds of work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Mosaic(MosaicJob),
    Merge(MergeJob),
}

/// Parameters for mosaicking one tile (or tile quadrant) from its subtiles.
/// Projection and extent are computed by the external numeric tool at run
/// time from the tile definition, so they never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MosaicJob {
    pub script_dir: PathBuf,
    pub lib_path: PathBuf,
    pub function: String,
    pub subtile_dir: PathBuf,
    pub resolution: u32,
    pub output: PathBuf,
    pub tile: String,
    pub tile_def: String,
    pub quadrant: Option<String>,
    pub finfile: PathBuf,
    pub version: String,
}

/// Parameters for merging the buffers of one quadrant-tile group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeJob {
    pub script_dir: PathBuf,
    pub dst_dir: PathBuf,
    pub tile_list: String,
    pub lib_path: PathBuf,
}

/// One runnable job: a scheduler-safe name plus its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    pub name: String,
    pub kind: JobKind,
}

impl JobDescriptor {
    /// Ordered named parameters, in the positional order the scheduler
    /// wrapper script expects.
    pub fn params(&self) -> Vec<JobParam> {
        match &self.kind {
            JobKind::Mosaic(job) => vec![
                param("p1", job.script_dir.display().to_string()),
                param("p2", job.lib_path.display().to_string()),
                param("p3", job.function.clone()),
                param("p4", job.subtile_dir.display().to_string()),
                param("p5", job.resolution.to_string()),
                param("p6", job.output.display().to_string()),
                param("p7", job.tile.clone()),
                param("p8", job.tile_def.clone()),
                param("p9", job.quadrant.clone().unwrap_or_else(|| "null".to_string())),
                param("p10", job.finfile.display().to_string()),
                param("p11", job.version.clone()),
            ],
            JobKind::Merge(job) => vec![
                param("p1", job.script_dir.display().to_string()),
                param("p2", job.dst_dir.display().to_string()),
                param("p3", job.tile_list.clone()),
                param("p4", job.lib_path.display().to_string()),
            ],
        }
    }
}

/// Environment shared by every job built in one batch invocation.
#[derive(Debug, Clone)]
pub struct JobEnv {
    pub script_dir: PathBuf,
    pub lib_path: PathBuf,
}

/// Matlab entry point for mosaic units.
pub const MOSAIC_FUNCTION: &str = "mosaicSubTiles";
/// Matlab entry point for merge units.
pub const MERGE_FUNCTION: &str = "batch_batchMergeQuadTileBuffer";

/// Build the descriptor for one freshness-approved mosaic unit.
#[allow(clippy::too_many_arguments)]
pub fn build_mosaic_job(
    env: &JobEnv,
    tile: &TileName,
    quadrant: Option<Quadrant>,
    res: Resolution,
    subtile_dir: &Path,
    output: &Path,
    finfile: &Path,
    tile_def: &str,
    version: &str,
) -> JobDescriptor {
    JobDescriptor {
        name: format!("mst_{}", tile.base()),
        kind: JobKind::Mosaic(MosaicJob {
            script_dir: env.script_dir.clone(),
            lib_path: env.lib_path.clone(),
            function: MOSAIC_FUNCTION.to_string(),
            subtile_dir: subtile_dir.to_path_buf(),
            resolution: res.meters(),
            output: output.to_path_buf(),
            tile: tile.base(),
            tile_def: tile_def.to_string(),
            quadrant: quadrant.map(|quad| quad.to_string()),
            finfile: finfile.to_path_buf(),
            version: version.to_string(),
        }),
    }
}

/// Build the descriptor for one merge group.
pub fn build_merge_job(env: &JobEnv, dst_dir: &Path, group: &MergeGroup) -> JobDescriptor {
    JobDescriptor {
        name: format!("tbm_{}", group.key),
        kind: JobKind::Merge(MergeJob {
            script_dir: env.script_dir.clone(),
            dst_dir: dst_dir.to_path_buf(),
            tile_list: group.member_list(),
            lib_path: env.lib_path.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::MosaicUnitPaths;

    fn env() -> JobEnv {
        JobEnv {
            script_dir: PathBuf::from("/scripts"),
            lib_path: PathBuf::from("/lib"),
        }
    }

    #[test]
    fn mosaic_params_are_ordered_and_named() {
        let tile = TileName::parse("37_42").unwrap();
        let paths =
            MosaicUnitPaths::new(Path::new("/data"), &tile, Some(Quadrant::Q21), Resolution::TwoMeter);
        let job = build_mosaic_job(
            &env(),
            &tile,
            Some(Quadrant::Q21),
            Resolution::TwoMeter,
            &paths.subtile_dir,
            &paths.output,
            &paths.finfile,
            "Tile_Defs.mat",
            "Demo|1.0",
        );
        assert_eq!(job.name, "mst_37_42");
        let params = job.params();
        let keys: Vec<_> = params.iter().map(|p| p.key).collect();
        assert_eq!(
            keys,
            vec!["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11"]
        );
        assert_eq!(params[4].value, "2");
        assert_eq!(params[8].value, "2_1");
        assert_eq!(params[10].value, "Demo|1.0");
    }

    #[test]
    fn quadrant_free_unit_uses_null_sentinel() {
        let tile = TileName::parse("37_42").unwrap();
        let paths = MosaicUnitPaths::new(Path::new("/data"), &tile, None, Resolution::TenMeter);
        let job = build_mosaic_job(
            &env(),
            &tile,
            None,
            Resolution::TenMeter,
            &paths.subtile_dir,
            &paths.output,
            &paths.finfile,
            "Tile_Defs.mat",
            "Demo|1.0",
        );
        assert_eq!(job.params()[8].value, "null");
    }

    #[test]
    fn descriptors_are_reproducible() {
        let group = MergeGroup {
            key: "none_37_2".to_string(),
            members: vec!["37_42_2_1".to_string(), "37_42_2_2".to_string()],
        };
        let first = build_merge_job(&env(), Path::new("/dst"), &group);
        let second = build_merge_job(&env(), Path::new("/dst"), &group);
        assert_eq!(first, second);
        assert_eq!(first.params(), second.params());
        assert_eq!(first.params()[2].value, "37_42_2_1;37_42_2_2");
    }
}
