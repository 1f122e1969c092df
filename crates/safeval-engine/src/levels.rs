//! Integrity level definitions
//!
//! ISO 13849 Performance Levels (PLa..PLe), IEC 62061 Safety Integrity Levels
//! (SIL1..SIL3) and ISO 13849 architecture categories (B, 1..4).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Performance Level according to ISO 13849-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceLevel {
    /// PLa - 10^-5 <= PFHd < 10^-4
    A,
    /// PLb - 3x10^-6 <= PFHd < 10^-5
    B,
    /// PLc - 10^-6 <= PFHd < 3x10^-6
    C,
    /// PLd - 10^-7 <= PFHd < 10^-6
    D,
    /// PLe - 10^-8 <= PFHd < 10^-7
    E,
}

impl PerformanceLevel {
    pub const ALL: [PerformanceLevel; 5] = [
        PerformanceLevel::A,
        PerformanceLevel::B,
        PerformanceLevel::C,
        PerformanceLevel::D,
        PerformanceLevel::E,
    ];

    /// PFHd band `[lower, upper)` for this level
    pub fn pfhd_band(&self) -> (f64, f64) {
        match self {
            PerformanceLevel::A => (1e-5, 1e-4),
            PerformanceLevel::B => (3e-6, 1e-5),
            PerformanceLevel::C => (1e-6, 3e-6),
            PerformanceLevel::D => (1e-7, 1e-6),
            PerformanceLevel::E => (1e-8, 1e-7),
        }
    }

    /// Highest PL whose upper PFHd bound is not reached by `pfhd`
    pub fn from_pfhd(pfhd: f64) -> Option<PerformanceLevel> {
        if !pfhd.is_finite() || pfhd < 0.0 {
            return None;
        }
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|pl| pfhd < pl.pfhd_band().1)
    }

    /// Check if this level satisfies a required level
    pub fn satisfies(&self, required: &PerformanceLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceLevel::A => write!(f, "PLa"),
            PerformanceLevel::B => write!(f, "PLb"),
            PerformanceLevel::C => write!(f, "PLc"),
            PerformanceLevel::D => write!(f, "PLd"),
            PerformanceLevel::E => write!(f, "PLe"),
        }
    }
}

impl FromStr for PerformanceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let letter = normalized.strip_prefix("pl").unwrap_or(&normalized).trim();
        match letter {
            "a" => Ok(PerformanceLevel::A),
            "b" => Ok(PerformanceLevel::B),
            "c" => Ok(PerformanceLevel::C),
            "d" => Ok(PerformanceLevel::D),
            "e" => Ok(PerformanceLevel::E),
            _ => Err(format!("unknown performance level '{}'", s)),
        }
    }
}

/// Safety Integrity Level according to IEC 62061
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sil {
    /// SIL 1 - 10^-6 <= PFHd < 10^-5
    Sil1,
    /// SIL 2 - 10^-7 <= PFHd < 10^-6
    Sil2,
    /// SIL 3 - 10^-8 <= PFHd < 10^-7
    Sil3,
}

impl Sil {
    pub const ALL: [Sil; 3] = [Sil::Sil1, Sil::Sil2, Sil::Sil3];

    /// PFHd band `[lower, upper)` for this level
    pub fn pfhd_band(&self) -> (f64, f64) {
        match self {
            Sil::Sil1 => (1e-6, 1e-5),
            Sil::Sil2 => (1e-7, 1e-6),
            Sil::Sil3 => (1e-8, 1e-7),
        }
    }

    /// Maximum PFHd permitted for this level
    pub fn max_pfhd(&self) -> f64 {
        self.pfhd_band().1
    }

    /// Highest SIL whose upper PFHd bound is not reached by `pfhd`
    ///
    /// Returns `None` when the PFHd is too high for SIL1 or not a number.
    pub fn from_pfhd(pfhd: f64) -> Option<Sil> {
        if !pfhd.is_finite() || pfhd < 0.0 {
            return None;
        }
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|sil| pfhd < sil.max_pfhd())
    }

    pub fn number(&self) -> u8 {
        match self {
            Sil::Sil1 => 1,
            Sil::Sil2 => 2,
            Sil::Sil3 => 3,
        }
    }
}

impl fmt::Display for Sil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIL{}", self.number())
    }
}

impl FromStr for Sil {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let digit = normalized.strip_prefix("sil").unwrap_or(&normalized).trim();
        match digit {
            "1" => Ok(Sil::Sil1),
            "2" => Ok(Sil::Sil2),
            "3" => Ok(Sil::Sil3),
            _ => Err(format!("unknown SIL '{}'", s)),
        }
    }
}

/// Designated architecture category according to ISO 13849-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    B,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::B,
        Category::One,
        Category::Two,
        Category::Three,
        Category::Four,
    ];

    /// Categories 3 and 4 tolerate a single fault
    pub fn requires_redundancy(&self) -> bool {
        matches!(self, Category::Three | Category::Four)
    }

    /// Categories 2 to 4 rely on diagnostics and a passing CCF score
    pub fn requires_ccf_measures(&self) -> bool {
        *self >= Category::Two
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::B => "B",
            Category::One => "1",
            Category::Two => "2",
            Category::Three => "3",
            Category::Four => "4",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cat {}", self.tag())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let tag = normalized
            .strip_prefix("category")
            .or_else(|| normalized.strip_prefix("cat"))
            .unwrap_or(&normalized)
            .trim();
        match tag {
            "b" => Ok(Category::B),
            "1" => Ok(Category::One),
            "2" => Ok(Category::Two),
            "3" => Ok(Category::Three),
            "4" => Ok(Category::Four),
            _ => Err(format!("unknown category '{}'", s)),
        }
    }
}
