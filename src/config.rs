//! One-time construction and validation of run configuration.
//!
//! Everything the components need is resolved here, once, before any
//! filesystem mutation: tile lists parsed and deduplicated, project defaults
//! applied, paths verified, and the precursor override flags collapsed into a
//! single policy value. Configuration problems are fatal; nothing downstream
//! has to re-validate.

use crate::cli::{MergeArgs, MosaicArgs};
use crate::freshness::PrecursorPolicy;
use crate::grouper::Dimension;
use crate::tile::{Resolution, TileName};
use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Known mosaic projects, each carrying default tile-definition and version
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Project {
    #[value(name = "arcticdem")]
    ArcticDem,
    #[value(name = "rema")]
    Rema,
    #[value(name = "earthdem")]
    EarthDem,
}

pub const TILEDEF_UTM_NORTH: &str = "PGC_UTM_Mosaic_Tiles_North.mat";
pub const TILEDEF_UTM_SOUTH: &str = "PGC_UTM_Mosaic_Tiles_South.mat";

impl Project {
    fn default_tile_def(&self) -> TileDefSource {
        match self {
            Project::ArcticDem => {
                TileDefSource::Fixed("PGC_Imagery_Mosaic_Tiles_Arctic.mat".to_string())
            }
            Project::Rema => {
                TileDefSource::Fixed("PGC_Imagery_Mosaic_Tiles_Antarctic.mat".to_string())
            }
            Project::EarthDem => TileDefSource::UtmAuto,
        }
    }

    fn default_version(&self) -> &'static str {
        match self {
            Project::ArcticDem => "ArcticDEM|4.1",
            Project::Rema => "REMA|2.0",
            Project::EarthDem => "EarthDEM|1.0",
        }
    }
}

/// Where the tile definition file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileDefSource {
    /// A single file name, resolved relative to the script directory.
    Fixed(String),
    /// Chosen per tile from the UTM hemisphere suffix (earthdem).
    UtmAuto,
}

/// Validated configuration for the mosaic (per-tile) command.
#[derive(Debug, Clone)]
pub struct MosaicConfig {
    pub src_dir: PathBuf,
    pub tiles: Vec<TileName>,
    pub resolution: Resolution,
    pub script_dir: PathBuf,
    pub lib_path: PathBuf,
    pub tile_def: TileDefSource,
    pub version: String,
    pub quads: bool,
    pub policy: PrecursorPolicy,
    pub require_mst_finfiles: bool,
    pub pbs: bool,
    pub qsub_script: PathBuf,
    pub dry_run: bool,
}

impl MosaicConfig {
    pub fn from_args(args: &MosaicArgs) -> Result<MosaicConfig> {
        let policy =
            PrecursorPolicy::from_flags(args.bypass_bst_finfile_req, args.relax_bst_finfile_req)?;

        let src_dir = absolute_dir(&args.src_dir, "srcdir")?;
        let script_dir = resolve_script_dir(args.script_dir.as_deref())?;
        let lib_path = resolve_lib_path(args.lib_path.as_deref(), &script_dir);
        if !lib_path.is_dir() {
            bail!("--lib-path does not exist: {}", lib_path.display());
        }

        let tile_def = match (&args.tile_def, args.project) {
            (Some(name), _) => TileDefSource::Fixed(name.clone()),
            (None, Some(project)) => project.default_tile_def(),
            (None, None) => {
                bail!("--project must be provided when --tile-def is not")
            }
        };
        if let TileDefSource::Fixed(name) = &tile_def {
            let abs = script_dir.join(name);
            if !abs.is_file() {
                bail!("tile def file does not exist: {}", abs.display());
            }
        }

        let version = match (&args.mosaic_version, args.project) {
            (Some(version), _) => version.clone(),
            (None, Some(project)) => project.default_version().to_string(),
            (None, None) => {
                bail!("--project must be provided when --mosaic-version is not")
            }
        };

        let qsub_script = resolve_qsub_script(
            args.qsubscript.as_deref(),
            &script_dir,
            "qsub_mosaicSubTiles.sh",
            args.pbs,
        )?;

        Ok(MosaicConfig {
            src_dir,
            tiles: load_tiles(&args.tiles)?,
            resolution: args.res,
            script_dir,
            lib_path,
            tile_def,
            version,
            quads: args.quads,
            policy,
            require_mst_finfiles: args.require_mst_finfiles,
            pbs: args.pbs,
            qsub_script,
            dry_run: args.dryrun,
        })
    }

    /// The tile definition file for one tile. For fixed sources this is the
    /// configured name; for earthdem it is chosen from the UTM hemisphere
    /// suffix, and a non-UTM tile name is a configuration error.
    pub fn tile_def_for(&self, tile: &TileName) -> Result<String> {
        let name = match &self.tile_def {
            TileDefSource::Fixed(name) => name.clone(),
            TileDefSource::UtmAuto => {
                let Some(prefix) = tile.domain().filter(|p| p.starts_with("utm")) else {
                    bail!(
                        "expected a UTM tile name (e.g. 'utm10n_01_01'), got '{}'",
                        tile.base()
                    );
                };
                if prefix.ends_with('n') {
                    TILEDEF_UTM_NORTH.to_string()
                } else if prefix.ends_with('s') {
                    TILEDEF_UTM_SOUTH.to_string()
                } else {
                    bail!(
                        "UTM tile name prefix does not end with 'n' or 's': {}",
                        tile.base()
                    );
                }
            }
        };
        let abs = self.script_dir.join(&name);
        if !abs.is_file() {
            bail!("tile def file does not exist: {}", abs.display());
        }
        Ok(name)
    }
}

/// Validated configuration for the merge (quad-tile buffer) command.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub dst_dir: PathBuf,
    pub tiles: Vec<TileName>,
    pub dimension: Dimension,
    pub script_dir: PathBuf,
    pub lib_path: PathBuf,
    pub pbs: bool,
    pub qsub_script: PathBuf,
    pub dry_run: bool,
}

impl MergeConfig {
    pub fn from_args(args: &MergeArgs) -> Result<MergeConfig> {
        let dst_dir = absolute_dir(&args.dst_dir, "dstdir")?;
        let script_dir = resolve_script_dir(args.script_dir.as_deref())?;
        let qsub_script = resolve_qsub_script(
            args.qsubscript.as_deref(),
            &script_dir,
            "qsub_mergequadtilebuffer.sh",
            args.pbs,
        )?;
        Ok(MergeConfig {
            dst_dir,
            tiles: load_tiles(&args.tiles)?,
            dimension: args.dimension,
            lib_path: resolve_lib_path(args.lib_path.as_deref(), &script_dir),
            script_dir,
            pbs: args.pbs,
            qsub_script,
            dry_run: args.dryrun,
        })
    }
}

fn absolute_dir(path: &Path, label: &str) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("{label} does not exist: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("canonicalize {label} {}", path.display()))
}

fn resolve_script_dir(arg: Option<&Path>) -> Result<PathBuf> {
    match arg {
        Some(dir) => absolute_dir(dir, "--script-dir"),
        None => {
            let exe = std::env::current_exe().context("resolve executable path")?;
            Ok(exe
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")))
        }
    }
}

fn resolve_lib_path(arg: Option<&Path>, script_dir: &Path) -> PathBuf {
    match arg {
        Some(path) => path.to_path_buf(),
        None => script_dir.join("../setsm_postprocessing4"),
    }
}

fn resolve_qsub_script(
    arg: Option<&Path>,
    script_dir: &Path,
    default_name: &str,
    pbs: bool,
) -> Result<PathBuf> {
    let path = match arg {
        Some(path) => path.to_path_buf(),
        None => script_dir.join(default_name),
    };
    if pbs && !path.is_file() {
        bail!("qsub script path is not valid: {}", path.display());
    }
    Ok(path)
}

/// Load the requested tile set: either a comma-delimited list or, when the
/// argument names an existing file, one tile per line. The result is
/// deduplicated and sorted; every entry must parse as a bare tile name.
pub fn load_tiles(raw: &str) -> Result<Vec<TileName>> {
    let entries: Vec<String> = if Path::new(raw).is_file() {
        fs::read_to_string(raw)
            .with_context(|| format!("read tile list {raw}"))?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    } else {
        raw.split(',')
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    };
    if entries.is_empty() {
        bail!("no tiles requested");
    }

    let unique: BTreeSet<String> = entries.into_iter().collect();
    let mut tiles = Vec::with_capacity(unique.len());
    for entry in unique {
        let tile = TileName::parse(&entry)?;
        if tile.quadrant.is_some() {
            bail!("requested tile '{entry}' must not carry a quadrant suffix");
        }
        tiles.push(tile);
    }
    Ok(tiles)
}
