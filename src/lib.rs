//! Staleness-driven batch scheduler for raster mosaic tile processing.
//!
//! The core is a dependency-freshness and job-grouping engine: it inspects a
//! tree of marker files and output artifacts, applies a staleness/precedence
//! policy over modification times and existence, groups related tiles into
//! work units, and decides run/skip/rerun for each. Execution itself (a
//! numeric tool or a PBS scheduler) sits behind the [`dispatch::Dispatcher`]
//! seam.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod freshness;
pub mod grouper;
pub mod job;
pub mod merge;
pub mod mosaic;
pub mod paths;
pub mod probe;
pub mod report;
pub mod tile;
