//! Common Cause Failure (CCF) scoring
//!
//! Implements the ISO 13849-1 Annex F style checklist: each mitigation
//! measure from a fixed catalog carries a point weight, a selection scores
//! the sum of its distinct weights, and a score of at least
//! [`CCF_PASS_THRESHOLD`] passes.
//!
//! Below the threshold the scorer can propose additional measures. The
//! proposal is greedy (descending weight, catalog order on ties); it closes
//! the gap but does not guarantee the minimum number of measures.

use crate::warning::Warning;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum CCF score for categories 2, 3 and 4
pub const CCF_PASS_THRESHOLD: u32 = 65;

/// Mitigation measures against common cause failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CcfMeasure {
    /// Physical separation between signal paths
    Separation,
    /// Diverse technology/design for redundant channels
    Diversity,
    /// Wiring protection and galvanic isolation
    WiringIsolation,
    /// EMC and environmental immunity
    Emc,
    /// Maintenance and periodic testing regime
    MaintenanceTesting,
    /// Diverse logic/software in redundant channels
    LogicDiversity,
    /// Quality-assured development process
    QualityAssurance,
    /// Documented design and failure analysis
    Documentation,
}

/// A catalog entry: measure, code and point weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcfCatalogEntry {
    pub measure: CcfMeasure,
    pub code: &'static str,
    pub weight: u32,
    pub description: &'static str,
}

/// Reference catalog (weights sum to 100)
pub const CCF_CATALOG: [CcfCatalogEntry; 8] = [
    CcfCatalogEntry {
        measure: CcfMeasure::Separation,
        code: "SEP",
        weight: 15,
        description: "Physical separation between signal paths",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::Diversity,
        code: "DIV",
        weight: 20,
        description: "Diverse technology or design of redundant channels",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::WiringIsolation,
        code: "WIR",
        weight: 15,
        description: "Protected wiring and galvanic isolation",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::Emc,
        code: "EMC",
        weight: 25,
        description: "EMC and environmental immunity verified",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::MaintenanceTesting,
        code: "MNT",
        weight: 10,
        description: "Maintenance and periodic testing regime",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::LogicDiversity,
        code: "LOG",
        weight: 5,
        description: "Diverse logic or software in redundant channels",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::QualityAssurance,
        code: "QAP",
        weight: 5,
        description: "Quality-assured development process",
    },
    CcfCatalogEntry {
        measure: CcfMeasure::Documentation,
        code: "DOC",
        weight: 5,
        description: "Documented design and failure analysis",
    },
];

impl CcfMeasure {
    fn entry(&self) -> &'static CcfCatalogEntry {
        let index = match self {
            CcfMeasure::Separation => 0,
            CcfMeasure::Diversity => 1,
            CcfMeasure::WiringIsolation => 2,
            CcfMeasure::Emc => 3,
            CcfMeasure::MaintenanceTesting => 4,
            CcfMeasure::LogicDiversity => 5,
            CcfMeasure::QualityAssurance => 6,
            CcfMeasure::Documentation => 7,
        };
        &CCF_CATALOG[index]
    }

    pub fn weight(&self) -> u32 {
        self.entry().weight
    }

    pub fn code(&self) -> &'static str {
        self.entry().code
    }

    pub fn description(&self) -> &'static str {
        self.entry().description
    }

    /// Look up a measure by its catalog code (case-insensitive)
    pub fn from_code(code: &str) -> Option<CcfMeasure> {
        let code = code.trim();
        CCF_CATALOG
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
            .map(|e| e.measure)
    }
}

impl fmt::Display for CcfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} pts)", self.code(), self.weight())
    }
}

/// Maximum score reachable with the full catalog
pub fn catalog_total() -> u32 {
    CCF_CATALOG.iter().map(|e| e.weight).sum()
}

/// Result of a CCF assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcfAssessment {
    /// Distinct measures counted, in selection order
    pub selected: Vec<CcfMeasure>,
    pub score: u32,
    pub threshold: u32,
    pub is_passed: bool,
    /// Points missing to reach the threshold (0 when passed)
    pub gap: u32,
    /// Measures proposed to close the gap, in proposal order
    pub suggestions: Vec<CcfMeasure>,
    pub warnings: Vec<Warning>,
}

impl CcfAssessment {
    /// Points the suggestions would add
    pub fn suggested_points(&self) -> u32 {
        self.suggestions.iter().map(|m| m.weight()).sum()
    }
}

/// CCF scorer over the static catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct CcfScorer;

impl CcfScorer {
    pub fn new() -> Self {
        Self
    }

    /// Sum of weights of the distinct selected measures
    pub fn score(&self, selected: &[CcfMeasure]) -> u32 {
        let distinct: IndexSet<CcfMeasure> = selected.iter().copied().collect();
        distinct.iter().map(|m| m.weight()).sum()
    }

    /// Score a selection and propose measures if it does not pass
    pub fn assess(&self, selected: &[CcfMeasure]) -> CcfAssessment {
        let score = self.score(selected);
        self.assess_score(score, selected)
    }

    /// Score a selection given as catalog codes
    ///
    /// Unknown codes are reported and ignored.
    pub fn assess_codes<S: AsRef<str>>(&self, codes: &[S]) -> CcfAssessment {
        let mut measures = Vec::new();
        let mut warnings = Vec::new();
        for code in codes {
            match CcfMeasure::from_code(code.as_ref()) {
                Some(measure) => measures.push(measure),
                None => warnings.push(
                    Warning::new(
                        "W0301",
                        format!("Unknown CCF measure code '{}' ignored", code.as_ref()),
                    )
                    .about(code.as_ref()),
                ),
            }
        }

        let mut assessment = self.assess(&measures);
        warnings.append(&mut assessment.warnings);
        assessment.warnings = warnings;
        assessment
    }

    /// Evaluate an externally supplied score against the threshold
    ///
    /// `selected` lists the measures already credited so they are not
    /// proposed again.
    pub fn assess_score(&self, score: u32, selected: &[CcfMeasure]) -> CcfAssessment {
        let distinct: IndexSet<CcfMeasure> = selected.iter().copied().collect();
        let mut warnings = Vec::new();

        if score > catalog_total() {
            warnings.push(Warning::new(
                "W0302",
                format!(
                    "CCF score {} exceeds the catalog maximum of {}",
                    score,
                    catalog_total()
                ),
            ));
        }

        let is_passed = score >= CCF_PASS_THRESHOLD;
        let gap = CCF_PASS_THRESHOLD.saturating_sub(score);
        let suggestions = if is_passed {
            Vec::new()
        } else {
            self.fill_gap(gap, &distinct)
        };

        if !is_passed {
            let reachable: u32 = suggestions.iter().map(|m| m.weight()).sum();
            if reachable < gap {
                warnings.push(Warning::new(
                    "W0303",
                    format!(
                        "Remaining catalog measures add {} points; {} are needed to pass",
                        reachable, gap
                    ),
                ));
            }
        }

        tracing::debug!(score, gap, passed = is_passed, "CCF assessed");

        CcfAssessment {
            selected: distinct.into_iter().collect(),
            score,
            threshold: CCF_PASS_THRESHOLD,
            is_passed,
            gap,
            suggestions,
            warnings,
        }
    }

    /// Greedy gap filling: descending weight, catalog order on ties
    fn fill_gap(&self, gap: u32, chosen: &IndexSet<CcfMeasure>) -> Vec<CcfMeasure> {
        let mut candidates: Vec<&CcfCatalogEntry> = CCF_CATALOG
            .iter()
            .filter(|e| !chosen.contains(&e.measure))
            .collect();
        // stable sort keeps catalog order among equal weights
        candidates.sort_by(|a, b| b.weight.cmp(&a.weight));

        let mut covered = 0;
        let mut suggestions = Vec::new();
        for entry in candidates {
            if covered >= gap {
                break;
            }
            covered += entry.weight;
            suggestions.push(entry.measure);
        }
        suggestions
    }
}

/// Generate a human-readable CCF report
pub fn format_ccf_report(assessment: &CcfAssessment) -> String {
    let mut output = String::new();

    output.push_str("CCF Assessment\n");
    output.push_str(&format!("{}\n", "=".repeat(50)));
    output.push_str(&format!(
        "Score: {} / {} (threshold {})\n",
        assessment.score,
        catalog_total(),
        assessment.threshold
    ));
    output.push_str(&format!(
        "Status: {}\n",
        if assessment.is_passed { "PASS" } else { "FAIL" }
    ));

    if !assessment.selected.is_empty() {
        output.push_str("\nSelected measures:\n");
        for measure in &assessment.selected {
            output.push_str(&format!("  - {}: {}\n", measure, measure.description()));
        }
    }

    if !assessment.suggestions.is_empty() {
        output.push_str(&format!(
            "\nSuggested to close the {}-point gap:\n",
            assessment.gap
        ));
        for measure in &assessment.suggestions {
            output.push_str(&format!("  + {}: {}\n", measure, measure.description()));
        }
    }

    for warning in &assessment.warnings {
        output.push_str(&format!("{}\n", warning));
    }

    output
}
