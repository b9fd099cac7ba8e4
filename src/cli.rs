//! CLI argument parsing for the batch scheduler.
//!
//! The CLI is intentionally thin: flags map one-to-one onto the validated
//! configuration structs, and no decision policy lives here.

use crate::config::Project;
use crate::grouper::Dimension;
use crate::tile::Resolution;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "mbatch",
    version,
    about = "Staleness-driven batch scheduler for raster mosaic tiles",
    after_help = "Examples:\n  mbatch mosaic /data/mosaics 37_42,37_43 2 --project arcticdem --dryrun\n  mbatch mosaic /data/mosaics tiles.txt 10 --project rema --quads --pbs\n  mbatch merge /data/mosaics row 37_42,37_43 --dryrun",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level batch commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Mosaic(MosaicArgs),
    Merge(MergeArgs),
}

/// Mosaic subtiles into per-tile (or per-quadrant) outputs.
#[derive(Parser, Debug)]
#[command(about = "Mosaic tile subtiles, skipping units that are up to date")]
pub struct MosaicArgs {
    /// Source root directory (the level above the tile name directories)
    pub src_dir: PathBuf,

    /// Tiles: comma-delimited list, or a text file with one tile per line
    pub tiles: String,

    /// Output resolution in meters (2 or 10)
    pub res: Resolution,

    /// Path to the referenced numeric library functions
    #[arg(long, value_name = "DIR")]
    pub lib_path: Option<PathBuf>,

    /// Sets default values for project-specific arguments
    #[arg(long, value_enum)]
    pub project: Option<Project>,

    /// Mosaic tile definition file (defaults from --project)
    #[arg(long, value_name = "FILE")]
    pub tile_def: Option<String>,

    /// Mosaic version string (defaults from --project)
    #[arg(long, value_name = "STR")]
    pub mosaic_version: Option<String>,

    /// Build into quad subtiles
    #[arg(long)]
    pub quads: bool,

    /// Do not require BST finfiles to exist before mosaicking
    #[arg(long, conflicts_with = "relax_bst_finfile_req")]
    pub bypass_bst_finfile_req: bool,

    /// Allow mosaicking tiles with no BST finfile if the 10,000-th subtile exists
    #[arg(long, conflicts_with = "bypass_bst_finfile_req")]
    pub relax_bst_finfile_req: bool,

    /// Let existence of MST finfiles dictate reruns
    #[arg(long)]
    pub require_mst_finfiles: bool,

    /// Submit tasks to PBS
    #[arg(long)]
    pub pbs: bool,

    /// qsub script for PBS submission (default: qsub_mosaicSubTiles.sh in the script dir)
    #[arg(long, value_name = "FILE")]
    pub qsubscript: Option<PathBuf>,

    /// Directory holding tile definitions and qsub scripts (default: the executable's directory)
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Print actions without executing or deleting anything
    #[arg(long)]
    pub dryrun: bool,

    /// Emit the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Merge the buffers of adjacent quad tiles.
#[derive(Parser, Debug)]
#[command(about = "Group quad tiles by row or column and merge their buffers")]
pub struct MergeArgs {
    /// Target directory (the level above the tile name directories)
    pub dst_dir: PathBuf,

    /// Dimension on which to group tiles for merging (row or column)
    pub dimension: Dimension,

    /// Tiles: comma-delimited list, or a text file with one tile per line
    pub tiles: String,

    /// Path to the referenced numeric library functions
    #[arg(long, value_name = "DIR")]
    pub lib_path: Option<PathBuf>,

    /// Submit tasks to PBS
    #[arg(long)]
    pub pbs: bool,

    /// qsub script for PBS submission (default: qsub_mergequadtilebuffer.sh in the script dir)
    #[arg(long, value_name = "FILE")]
    pub qsubscript: Option<PathBuf>,

    /// Directory holding qsub scripts (default: the executable's directory)
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Print actions without executing or deleting anything
    #[arg(long)]
    pub dryrun: bool,

    /// Emit the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
