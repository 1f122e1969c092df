//! # safeval engine
//!
//! Functional-safety performance evaluation for machine safety functions.
//! Turns channel, device, architecture and diagnostic data into required vs.
//! achieved Performance Level (ISO 13849), achieved SIL (IEC 62061), category
//! suggestions, DCavg estimates and PL↔SIL consistency findings.
//!
//! Every calculator is a pure function of its inputs. Domain-data problems are
//! reported as [`Warning`]s next to a best-effort value; only missing referenced
//! entities surface as [`EngineError`].
//!
//! The results are engineering indicators, not certification decisions.

use thiserror::Error;

pub mod batch;
pub mod category;
pub mod ccf;
pub mod config;
pub mod consistency;
pub mod diagnostic_coverage;
pub mod evaluator;
pub mod function;
pub mod levels;
pub mod library;
pub mod model;
pub mod performance_level;
pub mod pfhd;
pub mod risk;
pub mod warning;

pub use batch::{BatchEvaluator, BatchItem, BatchOutcome, BatchReport};
pub use category::{CategoryAdvice, CategoryAdvisor, CategorySignals, CategorySuggestion};
pub use ccf::{CcfAssessment, CcfMeasure, CcfScorer, CCF_PASS_THRESHOLD};
pub use config::{ConfigError, EngineConfig};
pub use consistency::{check_consistency, map_pl_to_sil, map_sil_to_pl, ConsistencyCheckResult};
pub use diagnostic_coverage::{
    DcInput, DetailLevel, DeviceDc, DiagnosticCoverageCalculator, DiagnosticCoverageResult,
    TestParameters,
};
pub use evaluator::{
    format_evaluation_report, ChecklistItem, ComplianceChecklist, ComplianceEvaluator, DerivedValue,
    EvaluationResult,
};
pub use function::{FunctionEvaluation, SafetyFunctionEvaluator};
pub use levels::{Category, PerformanceLevel, Sil};
pub use library::{ComponentLibrary, FunctionRepository, ProjectStore};
pub use model::{DeviceSpec, SafetyFunctionSpec, SubsystemSpec};
pub use pfhd::{Architecture, PfhdAggregator, PfhdResult};
pub use risk::{RiskInput, RiskLevel, RiskScorer};
pub use warning::Warning;

/// Errors surfaced to callers of the engine.
///
/// Calculators never return these for bad domain data; only orchestration
/// preconditions (e.g. an unknown function id) fail a call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("Evaluation aborted: {0}")]
    Aborted(String),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Kind of entity an orchestration call could not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    SafetyFunction,
    Device,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::SafetyFunction => write!(f, "Safety function"),
            EntityKind::Device => write!(f, "Device"),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
