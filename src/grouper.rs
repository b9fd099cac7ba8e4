//! Merge-unit grouping: quadrant survey, legacy-output cleanup, and
//! adjacency bucketing.
//!
//! Tiles survive into groups quadrant by quadrant, keyed by domain prefix
//! plus a row- or column-adjacency coordinate. Groups come out sorted so a
//! rerun over unchanged filesystem state submits in the identical order.

use crate::paths;
use crate::probe;
use crate::tile::{Quadrant, TileName};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Sentinel domain key for tiles without a mosaic prefix.
const NO_DOMAIN: &str = "none";

/// Grouping dimension for merge units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Row,
    Column,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Row => f.write_str("row"),
            Dimension::Column => f.write_str("column"),
        }
    }
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "row" => Ok(Dimension::Row),
            "column" => Ok(Dimension::Column),
            other => anyhow::bail!("dimension must be 'row' or 'column', got '{other}'"),
        }
    }
}

/// One merge work unit: a group key and its surviving quadrant-tile members,
/// sorted for reproducible command construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub key: String,
    pub members: Vec<String>,
}

impl MergeGroup {
    /// Members joined for downstream command construction.
    pub fn member_list(&self) -> String {
        self.members.join(";")
    }
}

/// Everything the grouping pass produced or observed.
#[derive(Debug, Default)]
pub struct GroupingOutcome {
    /// Submittable groups (>= 2 members), sorted by key.
    pub groups: Vec<MergeGroup>,
    /// Degenerate groups skipped for having a single member.
    pub skipped_small: Vec<MergeGroup>,
    /// Tiles with legacy outputs but no quadrant precursors at all; excluded
    /// without deleting anything.
    pub inconsistent: Vec<String>,
    /// Missing quadrant precursor count per tile.
    pub missing_quadrants: BTreeMap<String, usize>,
    /// Legacy artifacts deleted, or that would be deleted under dry-run.
    pub stale_deletions: Vec<PathBuf>,
}

/// Partition tiles into merge groups, clearing stale legacy outputs on the
/// way (reported but left in place under `dry_run`).
pub fn group_tiles(
    dst_dir: &Path,
    tiles: &[TileName],
    dimension: Dimension,
    dry_run: bool,
) -> Result<GroupingOutcome> {
    let mut outcome = GroupingOutcome::default();
    let mut domains: BTreeMap<String, Vec<TileName>> = BTreeMap::new();

    for tile in tiles {
        let mut missing = 0usize;
        let mut surviving = Vec::new();
        for quad in Quadrant::ALL {
            let mat = paths::merge_quad_mat(dst_dir, tile, quad);
            if probe::exists(&mat) {
                surviving.push(tile.with_quadrant(quad));
            } else {
                warn!(
                    "tile {} 2m mat file does not exist: {}",
                    tile.with_quadrant(quad),
                    mat.display()
                );
                missing += 1;
            }
        }
        if missing > 0 {
            outcome.missing_quadrants.insert(tile.base(), missing);
        }

        let tile_dir = dst_dir.join(tile.base());
        let mut legacy = Vec::new();
        for pattern in paths::legacy_merge_patterns(tile) {
            legacy.extend(probe::glob_dir(&tile_dir, &pattern)?);
        }
        if !legacy.is_empty() {
            if missing == Quadrant::ALL.len() {
                // The legacy outputs are the only evidence of prior work;
                // deleting them with upstream state this ambiguous would be
                // unrecoverable.
                warn!(
                    "no quad mat files exist for tile {} but other tile results exist; \
                     skipping without deleting",
                    tile.base()
                );
                outcome.inconsistent.push(tile.base());
                continue;
            }
            let prefix = if dry_run { "(dryrun) " } else { "" };
            info!(
                "{prefix}removing existing tile results for {} ({} files)",
                tile.base(),
                legacy.len()
            );
            for old in legacy {
                if !dry_run {
                    fs::remove_file(&old)
                        .with_context(|| format!("remove {}", old.display()))?;
                }
                outcome.stale_deletions.push(old);
            }
        }

        let domain = tile.domain().unwrap_or(NO_DOMAIN).to_string();
        domains.entry(domain).or_default().extend(surviving);
    }

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (domain, quad_tiles) in &domains {
        for quad_tile in quad_tiles {
            let Some(quad) = quad_tile.quadrant else {
                continue;
            };
            let coordinate = match dimension {
                Dimension::Row => format!("{}_{}", quad_tile.row, quad.row()),
                Dimension::Column => format!("{}_{}", quad_tile.col, quad.col()),
            };
            let key = format!("{domain}_{coordinate}");
            groups.entry(key).or_default().push(quad_tile.to_string());
        }
    }

    for (key, mut members) in groups {
        members.sort();
        let group = MergeGroup { key, members };
        // Announced for every key, before the size check.
        info!("submitting tile group from {dimension} {}", group.key);
        if group.members.len() < 2 {
            info!(
                "tile group {} has only {} member ({}), skipping",
                group.key,
                group.members.len(),
                group.member_list()
            );
            outcome.skipped_small.push(group);
        } else {
            outcome.groups.push(group);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn tiles(names: &[&str]) -> Vec<TileName> {
        names.iter().map(|n| TileName::parse(n).unwrap()).collect()
    }

    fn seed_quads(root: &Path, tile: &str, quads: &[&str]) {
        for quad in quads {
            touch(&root.join(tile).join(format!("{tile}_{quad}_2m.mat")));
        }
    }

    #[test]
    fn groups_row_adjacent_quadrants() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "37_42", &["1_1", "1_2", "2_1", "2_2"]);
        seed_quads(dir.path(), "37_43", &["1_1", "2_1"]);

        let outcome =
            group_tiles(dir.path(), &tiles(&["37_42", "37_43"]), Dimension::Row, false).unwrap();

        // 37_42 contributes row groups none_37_1 and none_37_2 of size 2;
        // 37_43's quadrants land in the same keys, merging across tiles.
        let keys: Vec<_> = outcome.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["none_37_1", "none_37_2"]);
        assert_eq!(
            outcome.groups[0].members,
            vec!["37_42_1_1", "37_42_1_2", "37_43_1_1"]
        );
        assert_eq!(
            outcome.groups[1].members,
            vec!["37_42_2_1", "37_42_2_2", "37_43_2_1"]
        );
        assert_eq!(outcome.missing_quadrants.get("37_43"), Some(&2));
    }

    #[test]
    fn single_member_groups_are_skipped() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "37_42", &["2_1", "2_2"]);
        seed_quads(dir.path(), "37_43", &["2_1"]);

        let outcome =
            group_tiles(dir.path(), &tiles(&["37_42", "37_43"]), Dimension::Column, false)
                .unwrap();

        // Column keys: 42_1, 42_2, 43_1. Only size-1 groups get skipped.
        let submitted: Vec<_> = outcome.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(submitted, Vec::<&str>::new());
        assert_eq!(outcome.skipped_small.len(), 3);
    }

    #[test]
    fn domain_prefix_separates_buckets() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "utm10n_37_42", &["1_1", "1_2"]);
        seed_quads(dir.path(), "utm11n_37_42", &["1_1", "1_2"]);

        let outcome = group_tiles(
            dir.path(),
            &tiles(&["utm10n_37_42", "utm11n_37_42"]),
            Dimension::Row,
            false,
        )
        .unwrap();

        let keys: Vec<_> = outcome.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["utm10n_37_1", "utm11n_37_1"]);
    }

    #[test]
    fn legacy_outputs_deleted_unless_all_quads_missing() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "37_42", &["1_1", "1_2", "2_1"]);
        let legacy = dir.path().join("37_42/37_42_dem_2m_browse.tif");
        touch(&legacy);

        let outcome =
            group_tiles(dir.path(), &tiles(&["37_42"]), Dimension::Row, false).unwrap();
        assert!(!legacy.exists());
        assert_eq!(outcome.stale_deletions, vec![legacy]);
        assert!(outcome.inconsistent.is_empty());
    }

    #[test]
    fn all_quads_missing_with_legacy_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join("37_42/37_42_dem_2m_meta.txt");
        touch(&legacy);

        let outcome =
            group_tiles(dir.path(), &tiles(&["37_42"]), Dimension::Row, false).unwrap();
        assert!(legacy.exists(), "ambiguous state must not be deleted");
        assert_eq!(outcome.inconsistent, vec!["37_42".to_string()]);
        assert!(outcome.groups.is_empty());
        assert!(outcome.stale_deletions.is_empty());
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "37_42", &["1_1", "1_2"]);
        let legacy = dir.path().join("37_42/37_42_dem_2m_browse.tif");
        touch(&legacy);

        let outcome =
            group_tiles(dir.path(), &tiles(&["37_42"]), Dimension::Row, true).unwrap();
        assert!(legacy.exists());
        assert_eq!(outcome.stale_deletions, vec![legacy]);
    }

    #[test]
    fn grouping_is_idempotent() {
        let dir = TempDir::new().unwrap();
        seed_quads(dir.path(), "37_42", &["1_1", "1_2", "2_1", "2_2"]);
        seed_quads(dir.path(), "38_42", &["1_1", "2_2"]);

        let requested = tiles(&["37_42", "38_42"]);
        let first = group_tiles(dir.path(), &requested, Dimension::Row, true).unwrap();
        let second = group_tiles(dir.path(), &requested, Dimension::Row, true).unwrap();
        assert_eq!(first.groups, second.groups);
        assert_eq!(first.skipped_small, second.skipped_small);
    }
}
