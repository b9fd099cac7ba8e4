//! Staleness/precedence policy for mosaic work units.
//!
//! `decide` is a pure function of the observed facts (existence and mtime of
//! five artifacts plus the subtile directory) and the configured policy. It
//! returns exactly one decision; all filesystem reads happen up front in
//! [`ArtifactObservation::capture`] and all mutations happen later in the
//! orchestrator, so the decision itself is trivially testable.

use crate::paths::MosaicUnitPaths;
use crate::probe;
use anyhow::{bail, Result};
use std::fmt;
use std::time::SystemTime;

/// How strongly a run insists on precursor completion markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecursorPolicy {
    /// Precursor finfiles are required (default).
    Strict,
    /// Do not require precursor finfiles at all.
    Bypass,
    /// Accept the final-index subtile output in place of a finfile.
    Relax,
}

impl PrecursorPolicy {
    /// Collapse the two CLI override flags into one policy value. The flags
    /// are mutually exclusive; both set is a usage error caught here before
    /// any work unit is evaluated.
    pub fn from_flags(bypass: bool, relax: bool) -> Result<PrecursorPolicy> {
        match (bypass, relax) {
            (true, true) => {
                bail!("--bypass-bst-finfile-req and --relax-bst-finfile-req are mutually exclusive")
            }
            (true, false) => Ok(PrecursorPolicy::Bypass),
            (false, true) => Ok(PrecursorPolicy::Relax),
            (false, false) => Ok(PrecursorPolicy::Strict),
        }
    }
}

/// Everything the policy observes about one work unit's artifacts.
///
/// Each field is the artifact's mtime, `None` meaning absent.
#[derive(Debug, Clone, Default)]
pub struct ArtifactObservation {
    pub subtile_dir_exists: bool,
    /// Consumer finfile (`F_out`).
    pub finfile: Option<SystemTime>,
    /// Consumer data output (`D_out`).
    pub output: Option<SystemTime>,
    /// Precursor finfile at the requested resolution.
    pub precursor_res_fin: Option<SystemTime>,
    /// Precursor finfile at full (2m) resolution.
    pub precursor_2m_fin: Option<SystemTime>,
    /// Final-index subtile output, the fallback completion signal.
    pub precursor_index_mat: Option<SystemTime>,
}

impl ArtifactObservation {
    /// Read the current filesystem state for a unit. No side effects.
    pub fn capture(paths: &MosaicUnitPaths) -> ArtifactObservation {
        ArtifactObservation {
            subtile_dir_exists: probe::dir_exists(&paths.subtile_dir),
            finfile: probe::mtime(&paths.finfile),
            output: probe::mtime(&paths.output),
            precursor_res_fin: probe::mtime(&paths.precursor_res_fin),
            precursor_2m_fin: probe::mtime(&paths.precursor_2m_fin),
            precursor_index_mat: probe::mtime(&paths.precursor_index_mat),
        }
    }

    fn precursors(&self) -> impl Iterator<Item = SystemTime> + '_ {
        [
            self.precursor_res_fin,
            self.precursor_2m_fin,
            self.precursor_index_mat,
        ]
        .into_iter()
        .flatten()
    }
}

/// Why a unit was skipped without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No precursor completion signal exists.
    MissingPrecursor {
        /// The final-index subtile output does exist; relax mode would have
        /// accepted it.
        final_index_present: bool,
    },
    /// The output artifact already exists and finfile-driven reruns were not
    /// requested.
    OutputExists,
    /// The unit's own finfile exists (finfile-driven rerun mode).
    FinfilePresent,
}

/// Per-unit inconsistencies: recorded into the batch summary, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitError {
    /// The subtile directory does not exist at all.
    MissingSubtileDir,
    /// The finfile claims completion but the output artifact is gone.
    FinfileWithoutOutput,
}

/// The single action chosen for a work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    /// Run after deleting stale partial artifacts matching the output stem.
    CleanThenRun,
    Run,
    Error(UnitError),
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Skip(SkipReason::MissingPrecursor { .. }) => f.write_str("skip (missing precursor)"),
            Decision::Skip(SkipReason::OutputExists) => f.write_str("skip (output already present)"),
            Decision::Skip(SkipReason::FinfilePresent) => f.write_str("skip (finfile present)"),
            Decision::CleanThenRun => f.write_str("clean then run"),
            Decision::Run => f.write_str("run"),
            Decision::Error(UnitError::MissingSubtileDir) => f.write_str("error (subtile directory missing)"),
            Decision::Error(UnitError::FinfileWithoutOutput) => f.write_str("error (finfile present, output missing)"),
        }
    }
}

/// Decide run/skip/rerun for one mosaic unit.
///
/// Precedence is deliberate and preserved from long-observed behavior: an
/// existing output short-circuits detected staleness unless
/// `require_finfiles` opts into the stricter finfile-driven check.
pub fn decide(
    obs: &ArtifactObservation,
    policy: PrecursorPolicy,
    require_finfiles: bool,
) -> Decision {
    if !obs.subtile_dir_exists {
        return Decision::Error(UnitError::MissingSubtileDir);
    }

    let precursor_fin_present =
        obs.precursor_res_fin.is_some() || obs.precursor_2m_fin.is_some();

    let mut stale = false;
    if policy != PrecursorPolicy::Bypass && !precursor_fin_present {
        let final_index_present = obs.precursor_index_mat.is_some();
        if !(policy == PrecursorPolicy::Relax && final_index_present) {
            return Decision::Skip(SkipReason::MissingPrecursor {
                final_index_present,
            });
        }
        // Relax accepted the final-index signal; with no finfile to compare
        // against, the staleness check is not applicable.
    } else {
        for precursor in obs.precursors() {
            let newer_than_finfile = obs.finfile.is_some_and(|fin| precursor > fin);
            let newer_than_output = obs.output.is_some_and(|out| precursor > out);
            if newer_than_finfile || newer_than_output {
                stale = true;
            }
        }
    }

    if obs.output.is_some() && !require_finfiles {
        // Output existence wins over staleness; documented precedence rule.
        return Decision::Skip(SkipReason::OutputExists);
    }

    if obs.finfile.is_some() {
        if obs.output.is_none() {
            return Decision::Error(UnitError::FinfileWithoutOutput);
        }
        if !stale {
            return Decision::Skip(SkipReason::FinfilePresent);
        }
        // A stale finfile/output pair falls through; the rerun path clears
        // both artifacts via the shared output stem.
    }

    if stale {
        Decision::CleanThenRun
    } else {
        Decision::Run
    }
}
