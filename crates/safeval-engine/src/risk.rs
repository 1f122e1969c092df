//! Risk estimation (ISO 12100 style)
//!
//! Severity, frequency of exposure and avoidance difficulty are ordinal
//! inputs. The score is `severity * (frequency + avoidance)`, strictly
//! increasing in each input, and the risk level and required PL are step
//! functions of the score.

use crate::levels::PerformanceLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal rating shared by the three risk parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Low, Rating::Medium, Rating::High];

    pub fn ordinal(&self) -> u32 {
        match self {
            Rating::Low => 1,
            Rating::Medium => 2,
            Rating::High => 3,
        }
    }
}

/// Severity of the possible harm
pub type Severity = Rating;
/// Frequency and/or duration of exposure to the hazard
pub type Frequency = Rating;
/// Difficulty of avoiding or limiting the harm (High = scarcely possible)
pub type Avoidance = Rating;

/// Risk bands over the score range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Band a score (upper bounds inclusive: Low <= 4, Medium <= 8, High <= 12)
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=4 => RiskLevel::Low,
            5..=8 => RiskLevel::Medium,
            9..=12 => RiskLevel::High,
            _ => RiskLevel::Extreme,
        }
    }

    /// High and Extreme risks require documented risk reduction
    pub fn requires_reduction(&self) -> bool {
        *self >= RiskLevel::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Extreme => write!(f, "Extreme"),
        }
    }
}

/// Risk parameters of one hazard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskInput {
    pub severity: Severity,
    pub frequency: Frequency,
    pub avoidance: Avoidance,
    /// Free-text description of the risk reduction measures taken
    #[serde(default)]
    pub mitigation: String,
}

impl RiskInput {
    pub fn new(severity: Severity, frequency: Frequency, avoidance: Avoidance) -> Self {
        Self {
            severity,
            frequency,
            avoidance,
            mitigation: String::new(),
        }
    }

    pub fn with_mitigation(mut self, mitigation: &str) -> Self {
        self.mitigation = mitigation.to_string();
        self
    }

    pub fn has_mitigation(&self) -> bool {
        !self.mitigation.trim().is_empty()
    }
}

/// Scored risk of one hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub required_pl: PerformanceLevel,
}

/// Risk scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Numeric risk score in `[2, 18]`
    pub fn score(&self, severity: Severity, frequency: Frequency, avoidance: Avoidance) -> u32 {
        severity.ordinal() * (frequency.ordinal() + avoidance.ordinal())
    }

    /// Required PL for a score (<=3 a, <=5 b, <=8 c, <=12 d, else e)
    pub fn required_pl(&self, score: u32) -> PerformanceLevel {
        match score {
            0..=3 => PerformanceLevel::A,
            4..=5 => PerformanceLevel::B,
            6..=8 => PerformanceLevel::C,
            9..=12 => PerformanceLevel::D,
            _ => PerformanceLevel::E,
        }
    }

    pub fn assess(&self, input: &RiskInput) -> RiskAssessment {
        let score = self.score(input.severity, input.frequency, input.avoidance);
        let assessment = RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            required_pl: self.required_pl(score),
        };
        tracing::debug!(
            score,
            level = %assessment.level,
            required_pl = %assessment.required_pl,
            "risk assessed"
        );
        assessment
    }
}
