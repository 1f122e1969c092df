//! Achieved Performance Level (ISO 13849-1 simplified procedure)
//!
//! The achieved PL follows from the designated category, the DCavg band and
//! the MTTFd band of each channel (ISO 13849-1 Figure 5). When a category's
//! preconditions are not met the evaluation continues with the highest
//! category the parameters do support, and a warning records the downgrade.

use crate::ccf::CCF_PASS_THRESHOLD;
use crate::diagnostic_coverage::DcBand;
use crate::levels::{Category, PerformanceLevel};
use crate::model::HOURS_PER_YEAR;
use crate::warning::Warning;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MTTFd values above this are capped (years)
pub const MTTFD_CAP_YEARS: f64 = 100.0;
/// Below this no PL can be claimed (years)
pub const MTTFD_MIN_YEARS: f64 = 3.0;

/// MTTFd band per channel (ISO 13849-1 Table 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MttfdBand {
    /// 3 <= MTTFd < 10 years
    Low,
    /// 10 <= MTTFd < 30 years
    Medium,
    /// 30 <= MTTFd <= 100 years
    High,
}

impl MttfdBand {
    /// Band for an MTTFd in years; `None` below 3 years
    pub fn from_years(years: f64) -> Option<Self> {
        if years >= 30.0 {
            Some(MttfdBand::High)
        } else if years >= 10.0 {
            Some(MttfdBand::Medium)
        } else if years >= MTTFD_MIN_YEARS {
            Some(MttfdBand::Low)
        } else {
            None
        }
    }
}

impl fmt::Display for MttfdBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MttfdBand::Low => write!(f, "Low (3-10 years)"),
            MttfdBand::Medium => write!(f, "Medium (10-30 years)"),
            MttfdBand::High => write!(f, "High (30-100 years)"),
        }
    }
}

/// MTTFd of a channel of devices in series (hours)
///
/// `1 / Σ (1 / MTTFd_i)`; devices without a positive MTTFd are skipped.
pub fn series_mttfd(mttfd_hours: &[f64]) -> f64 {
    let rate: f64 = mttfd_hours
        .iter()
        .filter(|m| m.is_finite() && **m > 0.0)
        .map(|m| 1.0 / m)
        .sum();
    if rate > 0.0 {
        1.0 / rate
    } else {
        0.0
    }
}

/// Symmetrised MTTFd of two different channels (ISO 13849-1 Annex D)
///
/// `2/3 * (C1 + C2 - 1 / (1/C1 + 1/C2))`
pub fn symmetrised_mttfd(c1: f64, c2: f64) -> f64 {
    if c1 <= 0.0 || c2 <= 0.0 {
        return c1.max(c2).max(0.0);
    }
    2.0 / 3.0 * (c1 + c2 - 1.0 / (1.0 / c1 + 1.0 / c2))
}

/// ISO 13849 parameters for PL determination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iso13849Parameters {
    /// Required PL (PLr), if known
    #[serde(default)]
    pub required_pl: Option<PerformanceLevel>,
    /// Designated architecture category
    pub category: Category,
    /// DCavg (0.0-1.0)
    pub dc_avg: f64,
    /// MTTFd per channel (hours)
    pub mttfd_hours: f64,
    /// CCF score (0-100)
    pub ccf_score: u32,
    /// Whether validation has been performed
    #[serde(default)]
    pub validation_performed: bool,
}

/// Result of a PL determination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlDetermination {
    pub achieved: Option<PerformanceLevel>,
    pub declared_category: Category,
    /// Category the PL was read from after downgrades
    pub effective_category: Category,
    pub dc_band: DcBand,
    pub mttfd_band: Option<MttfdBand>,
    /// MTTFd after capping (years)
    pub mttfd_years: f64,
    pub warnings: Vec<Warning>,
}

impl PlDetermination {
    pub fn meets(&self, required: PerformanceLevel) -> bool {
        self.achieved.map(|pl| pl.satisfies(&required)).unwrap_or(false)
    }
}

/// Figure 5 lookup for a category whose preconditions hold
fn figure5(category: Category, dc: DcBand, mttfd: MttfdBand) -> Option<PerformanceLevel> {
    use MttfdBand::*;
    use PerformanceLevel as PL;

    match category {
        Category::B => Some(match mttfd {
            Low => PL::A,
            Medium | High => PL::B,
        }),
        Category::One => match mttfd {
            High => Some(PL::C),
            _ => None,
        },
        Category::Two => Some(match (dc, mttfd) {
            (DcBand::Low, Low) => PL::A,
            (DcBand::Low, Medium) => PL::B,
            (DcBand::Low, High) => PL::C,
            (_, Low) => PL::B,
            (_, Medium) => PL::C,
            (_, High) => PL::D,
        }),
        Category::Three => Some(match (dc, mttfd) {
            (DcBand::Low, Low) => PL::B,
            (DcBand::Low, Medium) => PL::C,
            (DcBand::Low, High) => PL::D,
            (_, Low) => PL::C,
            (_, Medium) => PL::D,
            (_, High) => PL::D,
        }),
        Category::Four => match mttfd {
            High => Some(PL::E),
            _ => None,
        },
    }
}

/// Determine the achieved PL
pub fn determine_performance_level(params: &Iso13849Parameters) -> PlDetermination {
    let mut warnings = Vec::new();

    let dc_avg = if params.dc_avg.is_finite() && (0.0..=1.0).contains(&params.dc_avg) {
        params.dc_avg
    } else {
        let clamped = if params.dc_avg.is_nan() {
            0.0
        } else {
            params.dc_avg.clamp(0.0, 1.0)
        };
        warnings.push(Warning::new(
            "W0601",
            format!("DCavg {} is outside [0, 1]; using {}", params.dc_avg, clamped),
        ));
        clamped
    };
    let dc_band = DcBand::from_dc(dc_avg);

    let mut mttfd_years = if params.mttfd_hours.is_nan() {
        0.0
    } else {
        params.mttfd_hours / HOURS_PER_YEAR
    };
    if mttfd_years > MTTFD_CAP_YEARS {
        warnings.push(Warning::new(
            "W0602",
            format!(
                "MTTFd of {:.1} years capped at {} years",
                mttfd_years, MTTFD_CAP_YEARS
            ),
        ));
        mttfd_years = MTTFD_CAP_YEARS;
    }
    let mttfd_band = MttfdBand::from_years(mttfd_years);

    let Some(mttfd) = mttfd_band else {
        warnings.push(Warning::new(
            "W0603",
            format!(
                "MTTFd of {:.2} years is below the {} year minimum; no PL can be claimed",
                mttfd_years, MTTFD_MIN_YEARS
            ),
        ));
        return PlDetermination {
            achieved: None,
            declared_category: params.category,
            effective_category: params.category,
            dc_band,
            mttfd_band: None,
            mttfd_years,
            warnings,
        };
    };

    let mut category = params.category;

    if category.requires_ccf_measures() && params.ccf_score < CCF_PASS_THRESHOLD {
        warnings.push(Warning::new(
            "W0604",
            format!(
                "{} requires a CCF score of {} (got {}); evaluating as Cat B",
                category, CCF_PASS_THRESHOLD, params.ccf_score
            ),
        ));
        category = Category::B;
    }

    if category == Category::Four && (dc_band < DcBand::High || mttfd < MttfdBand::High) {
        warnings.push(Warning::new(
            "W0605",
            format!(
                "Cat 4 requires high DCavg and high MTTFd (got {} and {}); evaluating as Cat 3",
                dc_band, mttfd
            ),
        ));
        category = Category::Three;
    }

    if matches!(category, Category::Two | Category::Three) && dc_band == DcBand::None {
        warnings.push(Warning::new(
            "W0605",
            format!(
                "{} requires at least low DCavg (got {}); evaluating as Cat B",
                category, dc_band
            ),
        ));
        category = Category::B;
    }

    if category == Category::One && mttfd < MttfdBand::High {
        warnings.push(Warning::new(
            "W0605",
            format!("Cat 1 requires high MTTFd (got {}); evaluating as Cat B", mttfd),
        ));
        category = Category::B;
    }

    let achieved = figure5(category, dc_band, mttfd);

    tracing::debug!(
        declared = %params.category,
        effective = %category,
        dc = %dc_band,
        mttfd = %mttfd,
        achieved = ?achieved,
        "performance level determined"
    );

    PlDetermination {
        achieved,
        declared_category: params.category,
        effective_category: category,
        dc_band,
        mttfd_band,
        mttfd_years,
        warnings,
    }
}
