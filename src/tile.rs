//! Tile name parsing and classification.
//!
//! Tile identifiers come in four shapes: a bare row/column pair (`37_42`), a
//! domain-prefixed pair (`utm10n_01_01`), and either of those with a trailing
//! quadrant (`37_42_2_1`). Parsing is total: a string either classifies into
//! exactly one shape or is a hard input error, never a silent default.

use anyhow::{bail, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// One of the four fixed sub-divisions of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quadrant {
    Q11,
    Q12,
    Q21,
    Q22,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Q11, Quadrant::Q12, Quadrant::Q21, Quadrant::Q22];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Q11 => "1_1",
            Quadrant::Q12 => "1_2",
            Quadrant::Q21 => "2_1",
            Quadrant::Q22 => "2_2",
        }
    }

    /// Row half of the quadrant coordinate (the first digit).
    pub fn row(&self) -> &'static str {
        match self {
            Quadrant::Q11 | Quadrant::Q12 => "1",
            Quadrant::Q21 | Quadrant::Q22 => "2",
        }
    }

    /// Column half of the quadrant coordinate (the second digit).
    pub fn col(&self) -> &'static str {
        match self {
            Quadrant::Q11 | Quadrant::Q21 => "1",
            Quadrant::Q12 | Quadrant::Q22 => "2",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target output resolution in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    TwoMeter,
    TenMeter,
}

impl Resolution {
    pub fn meters(&self) -> u32 {
        match self {
            Resolution::TwoMeter => 2,
            Resolution::TenMeter => 10,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.meters())
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2" => Ok(Resolution::TwoMeter),
            "10" => Ok(Resolution::TenMeter),
            other => bail!("resolution must be 2 or 10, got '{other}'"),
        }
    }
}

/// Structured tile identifier.
///
/// `row` and `col` stay as strings to preserve zero padding (`utm10n_01_01`);
/// they are validated as numeric by the parser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TileName {
    pub prefix: Option<String>,
    pub row: String,
    pub col: String,
    pub quadrant: Option<Quadrant>,
}

fn tile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A domain prefix must start with a letter, which keeps a trailing
    // quadrant pair (`_2_1`) from being misread as prefix + coordinates.
    RE.get_or_init(|| {
        Regex::new(r"^(?:([A-Za-z][A-Za-z0-9]*)_)?(\d+)_(\d+)(?:_([12]_[12]))?$")
            .unwrap_or_else(|err| panic!("tile name regex: {err}"))
    })
}

impl TileName {
    /// Parse a raw identifier, classifying it into exactly one recognized
    /// shape or failing.
    pub fn parse(raw: &str) -> Result<TileName> {
        let Some(caps) = tile_regex().captures(raw) else {
            bail!("tile name does not match a known pattern: '{raw}'");
        };
        let quadrant = match caps.get(4).map(|m| m.as_str()) {
            None => None,
            Some("1_1") => Some(Quadrant::Q11),
            Some("1_2") => Some(Quadrant::Q12),
            Some("2_1") => Some(Quadrant::Q21),
            Some("2_2") => Some(Quadrant::Q22),
            Some(other) => bail!("tile name '{raw}' has unrecognized quadrant '{other}'"),
        };
        Ok(TileName {
            prefix: caps.get(1).map(|m| m.as_str().to_string()),
            row: caps[2].to_string(),
            col: caps[3].to_string(),
            quadrant,
        })
    }

    /// The tile directory name: prefix + row/column, without any quadrant.
    pub fn base(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}_{}", prefix, self.row, self.col),
            None => format!("{}_{}", self.row, self.col),
        }
    }

    /// Domain/mosaic prefix, if present.
    pub fn domain(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn with_quadrant(&self, quadrant: Quadrant) -> TileName {
        TileName {
            quadrant: Some(quadrant),
            ..self.clone()
        }
    }
}

impl fmt::Display for TileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())?;
        if let Some(quadrant) = self.quadrant {
            write!(f, "_{quadrant}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_pair() {
        let tile = TileName::parse("37_42").unwrap();
        assert_eq!(tile.prefix, None);
        assert_eq!(tile.row, "37");
        assert_eq!(tile.col, "42");
        assert_eq!(tile.quadrant, None);
        assert_eq!(tile.to_string(), "37_42");
    }

    #[test]
    fn parses_prefixed_pair() {
        let tile = TileName::parse("utm10n_01_01").unwrap();
        assert_eq!(tile.domain(), Some("utm10n"));
        assert_eq!(tile.row, "01");
        assert_eq!(tile.col, "01");
        assert_eq!(tile.base(), "utm10n_01_01");
    }

    #[test]
    fn quadrant_beats_prefix_ambiguity() {
        // A numeric leading field cannot be a prefix, so the trailing pair
        // classifies as a quadrant.
        let tile = TileName::parse("37_42_2_1").unwrap();
        assert_eq!(tile.prefix, None);
        assert_eq!(tile.quadrant, Some(Quadrant::Q21));
        assert_eq!(tile.base(), "37_42");
    }

    #[test]
    fn parses_prefixed_with_quadrant() {
        let tile = TileName::parse("utm10n_01_02_1_2").unwrap();
        assert_eq!(tile.domain(), Some("utm10n"));
        assert_eq!(tile.quadrant, Some(Quadrant::Q12));
        assert_eq!(tile.to_string(), "utm10n_01_02_1_2");
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        for raw in ["", "37", "37_42_2", "37_42_3_1", "utm10n", "a_b", "37_42_1_1_1"] {
            assert!(TileName::parse(raw).is_err(), "expected rejection: {raw}");
        }
    }

    #[test]
    fn with_quadrant_round_trip() {
        let tile = TileName::parse("37_42").unwrap();
        let quad_tile = tile.with_quadrant(Quadrant::Q22);
        assert_eq!(quad_tile.to_string(), "37_42_2_2");
        assert_eq!(TileName::parse("37_42_2_2").unwrap(), quad_tile);
    }

    #[test]
    fn resolution_parse() {
        assert_eq!("2".parse::<Resolution>().unwrap(), Resolution::TwoMeter);
        assert_eq!("10".parse::<Resolution>().unwrap(), Resolution::TenMeter);
        assert!("5".parse::<Resolution>().is_err());
    }
}
