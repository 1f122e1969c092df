//! Architecture category advice (ISO 13849-1 designated architectures)
//!
//! Derives four predicates from the channel layout and evaluates a fixed
//! decision table:
//!
//! | Category | Condition                                   |
//! |----------|---------------------------------------------|
//! | B        | always (baseline)                           |
//! | 1        | no redundancy, no monitoring, no test equip |
//! | 2        | test equipment without redundancy           |
//! | 3        | redundancy + monitoring + CCF ok            |
//! | 4        | redundancy + monitoring + CCF ok            |
//!
//! Confidence values come from [`CategoryWeights`] and are fixed weights per
//! rule, not calibrated probabilities. A second pass flags contradictions
//! between a suggested (or declared) category and the detected signals.

use crate::ccf::CCF_PASS_THRESHOLD;
use crate::config::CategoryWeights;
use crate::levels::Category;
use crate::warning::Warning;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel layout signals for category derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategorySignals {
    pub input_channels: u32,
    pub logic_channels: u32,
    pub output_channels: u32,
    pub input_monitored: bool,
    pub logic_monitored: bool,
    pub output_monitored: bool,
    pub has_test_equipment: bool,
    pub ccf_score: u32,
}

impl CategorySignals {
    pub fn has_redundancy(&self) -> bool {
        self.input_channels >= 2 || self.logic_channels >= 2 || self.output_channels >= 2
    }

    pub fn has_monitoring(&self) -> bool {
        self.input_monitored || self.logic_monitored || self.output_monitored
    }

    pub fn ccf_ok(&self) -> bool {
        self.ccf_score >= CCF_PASS_THRESHOLD
    }
}

/// One suggested category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: Category,
    /// Rule confidence (0.0-1.0)
    pub confidence: f64,
    pub justification: String,
    /// Conditions the design must meet for the category to hold
    pub preconditions: Vec<String>,
}

/// Types of contradiction between a category and the signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Category 3/4 without redundant channels
    MissingRedundancy,
    /// Category 3/4 without any monitoring
    MissingMonitoring,
    /// Category 2-4 with a failing CCF score
    InsufficientCcf,
    /// Category 2 without test equipment
    MissingTestEquipment,
    /// Redundant channels declared as category B/1
    UnusedRedundancy,
}

/// Conflict severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

impl ConflictKind {
    pub fn severity(&self) -> ConflictSeverity {
        match self {
            ConflictKind::MissingRedundancy => ConflictSeverity::High,
            ConflictKind::MissingMonitoring => ConflictSeverity::High,
            ConflictKind::InsufficientCcf => ConflictSeverity::Medium,
            ConflictKind::MissingTestEquipment => ConflictSeverity::High,
            ConflictKind::UnusedRedundancy => ConflictSeverity::Low,
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            ConflictKind::MissingRedundancy => {
                "Add a second channel so that a single fault does not lead to loss of the safety function"
            }
            ConflictKind::MissingMonitoring => {
                "Add cross-monitoring or feedback monitoring of the redundant channels"
            }
            ConflictKind::InsufficientCcf => {
                "Apply further CCF measures until the score reaches 65 points"
            }
            ConflictKind::MissingTestEquipment => {
                "Provide test equipment that checks the safety function at suitable intervals"
            }
            ConflictKind::UnusedRedundancy => {
                "Consider claiming a higher category or document why redundancy is not credited"
            }
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::MissingRedundancy => write!(f, "missing redundancy"),
            ConflictKind::MissingMonitoring => write!(f, "missing monitoring"),
            ConflictKind::InsufficientCcf => write!(f, "insufficient CCF score"),
            ConflictKind::MissingTestEquipment => write!(f, "missing test equipment"),
            ConflictKind::UnusedRedundancy => write!(f, "unused redundancy"),
        }
    }
}

/// A detected contradiction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConflict {
    pub category: Category,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub message: String,
    pub remediation: String,
}

/// Suggestions plus conflicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAdvice {
    /// Sorted by descending confidence
    pub suggestions: Vec<CategorySuggestion>,
    pub conflicts: Vec<CategoryConflict>,
    pub warnings: Vec<Warning>,
}

impl CategoryAdvice {
    /// Highest-confidence suggestion
    pub fn best(&self) -> Option<&CategorySuggestion> {
        self.suggestions.first()
    }

    /// Highest category among the suggestions
    pub fn highest_category(&self) -> Category {
        self.suggestions
            .iter()
            .map(|s| s.category)
            .max()
            .unwrap_or(Category::B)
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Category advisor
#[derive(Debug, Clone, Default)]
pub struct CategoryAdvisor {
    weights: CategoryWeights,
}

impl CategoryAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: CategoryWeights) -> Self {
        Self { weights }
    }

    /// Evaluate the decision table
    pub fn suggest(&self, signals: &CategorySignals) -> Vec<CategorySuggestion> {
        let redundancy = signals.has_redundancy();
        let monitoring = signals.has_monitoring();
        let test = signals.has_test_equipment;
        let ccf_ok = signals.ccf_ok();

        let mut suggestions = vec![CategorySuggestion {
            category: Category::B,
            confidence: self.weights.baseline,
            justification: "Basic safety principles apply to every safety-related part".to_string(),
            preconditions: vec![
                "Components designed to withstand expected influences".to_string(),
                "Basic safety principles applied".to_string(),
            ],
        }];

        if !redundancy && !monitoring && !test {
            suggestions.push(CategorySuggestion {
                category: Category::One,
                confidence: self.weights.cat1,
                justification: "Single channel without monitoring or test equipment".to_string(),
                preconditions: vec![
                    "Well-tried components".to_string(),
                    "Well-tried safety principles".to_string(),
                    "MTTFd of each channel high (≥30 years)".to_string(),
                ],
            });
        }

        if test && !redundancy {
            suggestions.push(CategorySuggestion {
                category: Category::Two,
                confidence: self.weights.cat2,
                justification: "Single channel checked by test equipment".to_string(),
                preconditions: vec![
                    "Safety function checked at suitable intervals".to_string(),
                    "Test rate at least 100 times the demand rate".to_string(),
                    format!("CCF score of at least {}", CCF_PASS_THRESHOLD),
                ],
            });
        }

        if redundancy && monitoring && ccf_ok {
            suggestions.push(CategorySuggestion {
                category: Category::Three,
                confidence: self.weights.cat3,
                justification: "Redundant monitored channels with adequate CCF measures"
                    .to_string(),
                preconditions: vec![
                    "A single fault does not lead to loss of the safety function".to_string(),
                    "Single faults are detected whenever reasonably practicable".to_string(),
                    "DCavg at least low (≥60%)".to_string(),
                ],
            });
            suggestions.push(CategorySuggestion {
                category: Category::Four,
                confidence: self.weights.cat4,
                justification:
                    "Redundant monitored channels with adequate CCF measures; fault accumulation must be detected"
                        .to_string(),
                preconditions: vec![
                    "An accumulation of undetected faults does not lead to loss of the safety function"
                        .to_string(),
                    "DCavg high (≥99%)".to_string(),
                    "MTTFd of each channel high (≥30 years)".to_string(),
                ],
            });
        }

        // stable: equal confidences keep table order
        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        suggestions
    }

    /// Check a category against the signals
    pub fn conflicts_for(
        &self,
        category: Category,
        signals: &CategorySignals,
    ) -> Vec<CategoryConflict> {
        let mut kinds = Vec::new();

        if category.requires_redundancy() {
            if !signals.has_redundancy() {
                kinds.push(ConflictKind::MissingRedundancy);
            }
            if !signals.has_monitoring() {
                kinds.push(ConflictKind::MissingMonitoring);
            }
        }
        if category == Category::Two && !signals.has_test_equipment {
            kinds.push(ConflictKind::MissingTestEquipment);
        }
        if category.requires_ccf_measures() && !signals.ccf_ok() {
            kinds.push(ConflictKind::InsufficientCcf);
        }
        if category <= Category::One && signals.has_redundancy() {
            kinds.push(ConflictKind::UnusedRedundancy);
        }

        kinds
            .into_iter()
            .map(|kind| CategoryConflict {
                category,
                kind,
                severity: kind.severity(),
                message: format!("{} conflicts with the detected architecture: {}", category, kind),
                remediation: kind.remediation().to_string(),
            })
            .collect()
    }

    /// Suggest categories and flag contradictions
    ///
    /// `declared` is the category claimed by the design, if any; it is checked
    /// together with the suggestions.
    pub fn advise(&self, signals: &CategorySignals, declared: Option<Category>) -> CategoryAdvice {
        let suggestions = self.suggest(signals);

        let mut checked: Vec<Category> = suggestions.iter().map(|s| s.category).collect();
        if let Some(category) = declared {
            if !checked.contains(&category) {
                checked.push(category);
            }
        }

        let conflicts: Vec<CategoryConflict> = checked
            .into_iter()
            // B is the baseline and never contradicts the layout on its own
            .filter(|c| *c != Category::B || declared == Some(Category::B))
            .flat_map(|c| self.conflicts_for(c, signals))
            .collect();

        let mut warnings = Vec::new();
        if let Some(category) = declared {
            let blocking = conflicts
                .iter()
                .filter(|c| c.category == category && c.severity == ConflictSeverity::High)
                .count();
            if blocking > 0 {
                warnings.push(Warning::new(
                    "W0401",
                    format!(
                        "Declared {} has {} high-severity conflict(s) with the channel layout",
                        category, blocking
                    ),
                ));
            }
        }
        if suggestions.iter().all(|s| s.category == Category::B) {
            warnings.push(Warning::new(
                "W0402",
                "Only the Cat B baseline applies to this channel layout",
            ));
        }

        tracing::debug!(
            suggestions = suggestions.len(),
            conflicts = conflicts.len(),
            "category advice"
        );

        CategoryAdvice {
            suggestions,
            conflicts,
            warnings,
        }
    }
}
