//! Compliance evaluation (orchestrator)
//!
//! Single pass over a [`ComplianceChecklist`]: risk, PL achievement, CCF,
//! validation, general items and optionally PL↔SIL consistency. Findings are
//! collected as non-conformities together with a recommendation text built
//! from fixed fragments.

use crate::ccf::CcfScorer;
use crate::config::EngineConfig;
use crate::consistency::check_consistency;
use crate::function::{FunctionEvaluation, SafetyFunctionEvaluator};
use crate::levels::{PerformanceLevel, Sil};
use crate::library::{ComponentLibrary, FunctionRepository};
use crate::performance_level::{determine_performance_level, Iso13849Parameters};
use crate::risk::{RiskInput, RiskScorer};
use crate::warning::Warning;
use crate::EngineResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Checklist
// ============================================================================

/// A general pass/fail checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItem {
    pub fn required(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            required: true,
            completed: false,
        }
    }

    pub fn optional(id: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(id, description)
        }
    }

    pub fn done(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Everything the orchestrator needs for one verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceChecklist {
    pub risk: RiskInput,
    pub iso13849: Iso13849Parameters,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    /// Independently derived SIL, cross-checked against the achieved PL
    #[serde(default)]
    pub achieved_sil: Option<Sil>,
}

// ============================================================================
// Result
// ============================================================================

/// A named derived value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DerivedValue {
    Flag(bool),
    Integer(u64),
    Number(f64),
    Text(String),
}

impl fmt::Display for DerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedValue::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            DerivedValue::Integer(i) => write!(f, "{}", i),
            DerivedValue::Number(n) if n.abs() > 0.0 && n.abs() < 1e-3 => write!(f, "{:.3e}", n),
            DerivedValue::Number(n) => write!(f, "{:.4}", n),
            DerivedValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for DerivedValue {
    fn from(v: bool) -> Self {
        DerivedValue::Flag(v)
    }
}

impl From<u32> for DerivedValue {
    fn from(v: u32) -> Self {
        DerivedValue::Integer(v as u64)
    }
}

impl From<usize> for DerivedValue {
    fn from(v: usize) -> Self {
        DerivedValue::Integer(v as u64)
    }
}

impl From<f64> for DerivedValue {
    fn from(v: f64) -> Self {
        DerivedValue::Number(v)
    }
}

impl From<String> for DerivedValue {
    fn from(v: String) -> Self {
        DerivedValue::Text(v)
    }
}

impl From<&str> for DerivedValue {
    fn from(v: &str) -> Self {
        DerivedValue::Text(v.to_string())
    }
}

/// Overall verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub is_compliant: bool,
    pub summary: String,
    /// Derived values in evaluation order
    pub values: IndexMap<String, DerivedValue>,
    pub non_conformities: Vec<String>,
    pub recommended_actions: String,
    pub warnings: Vec<Warning>,
}

impl EvaluationResult {
    pub fn value(&self, name: &str) -> Option<&DerivedValue> {
        self.values.get(name)
    }
}

/// Accumulates findings while the checks run
#[derive(Default)]
struct Findings {
    values: IndexMap<String, DerivedValue>,
    non_conformities: Vec<String>,
    recommendations: Vec<String>,
    warnings: Vec<Warning>,
}

impl Findings {
    fn value(&mut self, name: &str, value: impl Into<DerivedValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    fn check(&mut self, passed: bool, non_conformity: impl FnOnce() -> String) {
        if !passed {
            self.non_conformities.push(non_conformity());
        }
    }

    fn recommend(&mut self, fragment: impl Into<String>) {
        self.recommendations.push(fragment.into());
    }

    fn finish(self, summary: String) -> EvaluationResult {
        EvaluationResult {
            is_compliant: self.non_conformities.is_empty(),
            summary,
            values: self.values,
            non_conformities: self.non_conformities,
            recommended_actions: self.recommendations.join("\n"),
            warnings: self.warnings,
        }
    }
}

fn pl_text(pl: Option<PerformanceLevel>) -> String {
    pl.map(|p| p.to_string()).unwrap_or_else(|| "n/a".to_string())
}

// ============================================================================
// Evaluator
// ============================================================================

/// Compliance evaluator
#[derive(Debug, Clone, Default)]
pub struct ComplianceEvaluator {
    config: EngineConfig,
}

impl ComplianceEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Evaluate a checklist
    ///
    /// Never fails: malformed values degrade to warnings and non-conformities.
    /// DCavg, MTTFd and the CCF score are taken as given, so the masking and
    /// PFHd coefficients of the configuration do not apply here; they are
    /// used by [`Self::evaluate_function`].
    pub fn evaluate(&self, checklist: &ComplianceChecklist) -> EvaluationResult {
        let mut findings = Findings::default();

        // risk
        let risk = RiskScorer::new().assess(&checklist.risk);
        findings.value("risk_score", risk.score);
        findings.value("risk_level", risk.level.to_string());
        findings.value("risk_required_pl", risk.required_pl.to_string());

        if !checklist.risk.has_mitigation() {
            if risk.level.requires_reduction() {
                findings
                    .non_conformities
                    .push("No risk reduction measures provided".to_string());
            } else {
                findings.warnings.push(Warning::new(
                    "W0701",
                    format!("{} risk without documented mitigation", risk.level),
                ));
            }
        }
        if risk.level.requires_reduction() {
            findings.recommend(format!(
                "Apply and document risk reduction measures for the {} risk (score {})",
                risk.level, risk.score
            ));
        }

        let required_pl = match checklist.iso13849.required_pl {
            Some(pl) => {
                findings.check(pl >= risk.required_pl, || {
                    format!(
                        "Required {} is below the {} derived from the risk assessment",
                        pl, risk.required_pl
                    )
                });
                if pl < risk.required_pl {
                    findings.recommend(format!(
                        "Raise the required PL to at least {}",
                        risk.required_pl
                    ));
                }
                pl
            }
            None => {
                findings.warnings.push(Warning::new(
                    "W0703",
                    format!(
                        "No required PL given; using {} from the risk assessment",
                        risk.required_pl
                    ),
                ));
                risk.required_pl
            }
        };
        findings.value("required_pl", required_pl.to_string());

        // PL achievement
        let params = Iso13849Parameters {
            required_pl: Some(required_pl),
            ..checklist.iso13849.clone()
        };
        let pl = determine_performance_level(&params);
        findings.value("effective_category", pl.effective_category.to_string());
        findings.value("dc_band", pl.dc_band.to_string());
        findings.value(
            "mttfd_band",
            pl.mttfd_band
                .map(|b| b.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        findings.value("achieved_pl", pl_text(pl.achieved));
        findings.value("pl_requirement_met", pl.meets(required_pl));

        match pl.achieved {
            None => {
                findings
                    .non_conformities
                    .push("Performance level could not be determined".to_string());
                findings.recommend(
                    "Provide MTTFd data of at least 3 years per channel so a PL can be determined",
                );
            }
            Some(achieved) if !achieved.satisfies(&required_pl) => {
                findings.non_conformities.push(format!(
                    "Achieved {} does not meet required {}",
                    achieved, required_pl
                ));
                findings.recommend(format!(
                    "Close the gap from {} to {}: improve DCavg (currently {}), MTTFd or the architecture category (currently {})",
                    achieved, required_pl, pl.dc_band, pl.effective_category
                ));
            }
            Some(_) => {}
        }
        findings.warnings.extend(pl.warnings);

        // CCF
        let ccf = CcfScorer::new().assess_score(checklist.iso13849.ccf_score, &[]);
        findings.value("ccf_score", ccf.score);
        findings.value("ccf_passed", ccf.is_passed);
        if checklist.iso13849.category.requires_ccf_measures() {
            findings.check(ccf.is_passed, || {
                format!(
                    "CCF score {} is below the threshold of {} required for {}",
                    ccf.score, ccf.threshold, checklist.iso13849.category
                )
            });
            if !ccf.is_passed && !ccf.suggestions.is_empty() {
                let names: Vec<String> = ccf.suggestions.iter().map(|m| m.to_string()).collect();
                findings.recommend(format!(
                    "Add CCF measures to close a gap of {} points: {}",
                    ccf.gap,
                    names.join(", ")
                ));
            }
        }
        findings.warnings.extend(ccf.warnings);

        // validation
        findings.value("validation_performed", checklist.iso13849.validation_performed);
        findings.check(checklist.iso13849.validation_performed, || {
            "Validation has not been performed".to_string()
        });
        if !checklist.iso13849.validation_performed {
            findings.recommend("Perform and document the validation of the safety function");
        }

        // general items
        let open_required: Vec<&ChecklistItem> = checklist
            .items
            .iter()
            .filter(|i| i.required && !i.completed)
            .collect();
        for item in &open_required {
            findings.non_conformities.push(format!(
                "Required checklist item '{}' not completed: {}",
                item.id, item.description
            ));
        }
        for item in checklist.items.iter().filter(|i| !i.required && !i.completed) {
            findings.warnings.push(
                Warning::new(
                    "W0702",
                    format!("Optional checklist item not completed: {}", item.description),
                )
                .about(&item.id),
            );
        }
        findings.value("open_required_items", open_required.len());
        if !open_required.is_empty() {
            let ids: Vec<&str> = open_required.iter().map(|i| i.id.as_str()).collect();
            findings.recommend(format!("Complete checklist items: {}", ids.join(", ")));
        }

        // PL↔SIL cross-check
        if let Some(sil) = checklist.achieved_sil {
            findings.value("achieved_sil", sil.to_string());
            let consistency = check_consistency(pl.achieved, Some(sil));
            findings.value("pl_sil_consistent", consistency.is_consistent);
            findings.check(consistency.is_consistent, || {
                format!("Achieved {} and {} are inconsistent", pl_text(pl.achieved), sil)
            });
            for action in consistency.recommended_actions {
                findings.recommend(action);
            }
            findings.warnings.extend(consistency.warnings);
        }

        let summary = summarize(
            findings.non_conformities.len(),
            &risk.level.to_string(),
            required_pl,
            pl.achieved,
        );

        tracing::info!(
            compliant = findings.non_conformities.is_empty(),
            non_conformities = findings.non_conformities.len(),
            "checklist evaluated"
        );

        findings.finish(summary)
    }

    /// Evaluate a stored safety function against its targets
    pub fn evaluate_function(
        &self,
        repository: &dyn FunctionRepository,
        library: &dyn ComponentLibrary,
        function_id: &str,
    ) -> EngineResult<EvaluationResult> {
        let evaluation = SafetyFunctionEvaluator::with_config(self.config.clone())
            .evaluate_by_id(repository, library, function_id)?;
        Ok(self.function_result(&evaluation))
    }

    /// Verdict for an already evaluated function
    pub fn function_result(&self, evaluation: &FunctionEvaluation) -> EvaluationResult {
        let mut findings = Findings::default();
        let pl = &evaluation.performance_level;
        let dc = &evaluation.diagnostic_coverage;

        findings.value("dc_avg", dc.dc_avg);
        findings.value("masking_limit", dc.masking_limit);
        findings.value("dc_capped", dc.capped);
        findings.value("ccf_score", evaluation.ccf.score);
        findings.value(
            "suggested_category",
            evaluation.category.highest_category().to_string(),
        );
        findings.value("effective_category", pl.effective_category.to_string());
        findings.value("channel_mttfd_years", evaluation.channel_mttfd_years);
        findings.value("achieved_pl", pl_text(pl.achieved));
        findings.value("total_pfhd", evaluation.pfhd.total_pfhd);
        findings.value(
            "achieved_sil",
            evaluation
                .pfhd
                .achieved_sil
                .map(|s| s.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        findings.value("pl_sil_consistent", evaluation.consistency.is_consistent);

        if evaluation.target_pl_met == Some(false) {
            if let Some(target) = evaluation.target_pl {
                findings.non_conformities.push(format!(
                    "Achieved {} does not meet target {}",
                    pl_text(pl.achieved),
                    target
                ));
            }
            findings.recommend(format!(
                "Improve DCavg (currently {}), channel MTTFd or the architecture category",
                pl.dc_band
            ));
        }
        if evaluation.target_sil_met == Some(false) {
            if let Some(target) = evaluation.target_sil {
                findings.non_conformities.push(format!(
                    "Total PFHd {:.3e} does not reach target {}",
                    evaluation.pfhd.total_pfhd, target
                ));
                findings.recommend(format!(
                    "Reduce total PFHd below {:.0e}",
                    target.max_pfhd()
                ));
            }
        }
        if !evaluation.consistency.is_consistent {
            findings.non_conformities.push(format!(
                "Achieved {} and {} are inconsistent",
                pl_text(pl.achieved),
                evaluation
                    .pfhd
                    .achieved_sil
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            ));
        }
        for action in &evaluation.consistency.recommended_actions {
            findings.recommend(action.clone());
        }
        for recommendation in &dc.recommendations {
            findings.recommend(recommendation.clone());
        }
        findings.warnings = evaluation.all_warnings().into_iter().cloned().collect();

        let summary = if findings.non_conformities.is_empty() {
            format!(
                "{}: targets met ({}, {})",
                evaluation.name,
                pl_text(pl.achieved),
                findings
                    .values
                    .get("achieved_sil")
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            )
        } else {
            format!(
                "{}: {} non-conformit{}",
                evaluation.name,
                findings.non_conformities.len(),
                if findings.non_conformities.len() == 1 { "y" } else { "ies" }
            )
        };
        findings.finish(summary)
    }
}

fn summarize(
    non_conformities: usize,
    risk_level: &str,
    required: PerformanceLevel,
    achieved: Option<PerformanceLevel>,
) -> String {
    let verdict = if non_conformities == 0 {
        "Compliant".to_string()
    } else {
        format!(
            "Not compliant ({} non-conformit{})",
            non_conformities,
            if non_conformities == 1 { "y" } else { "ies" }
        )
    };
    format!(
        "{}: {} risk, required {}, achieved {}",
        verdict,
        risk_level,
        required,
        pl_text(achieved)
    )
}

/// Generate a human-readable evaluation report
pub fn format_evaluation_report(result: &EvaluationResult) -> String {
    let mut output = String::new();

    output.push_str("Compliance Evaluation\n");
    output.push_str(&format!("{}\n", "=".repeat(50)));
    output.push_str(&format!("{}\n\n", result.summary));

    output.push_str("Derived values:\n");
    for (name, value) in &result.values {
        output.push_str(&format!("  {:<24} {}\n", name, value));
    }

    if !result.non_conformities.is_empty() {
        output.push_str("\nNon-conformities:\n");
        for nc in &result.non_conformities {
            output.push_str(&format!("  - {}\n", nc));
        }
    }

    if !result.recommended_actions.is_empty() {
        output.push_str("\nRecommended actions:\n");
        for line in result.recommended_actions.lines() {
            output.push_str(&format!("  - {}\n", line));
        }
    }

    if !result.warnings.is_empty() {
        output.push('\n');
        for warning in &result.warnings {
            output.push_str(&format!("{}\n", warning));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Category;
    use crate::model::HOURS_PER_YEAR;
    use crate::risk::Rating;

    fn checklist(risk: RiskInput, category: Category, dc: f64, mttfd_years: f64) -> ComplianceChecklist {
        ComplianceChecklist {
            risk,
            iso13849: Iso13849Parameters {
                required_pl: None,
                category,
                dc_avg: dc,
                mttfd_hours: mttfd_years * HOURS_PER_YEAR,
                ccf_score: 70,
                validation_performed: true,
            },
            items: Vec::new(),
            achieved_sil: None,
        }
    }

    #[test]
    fn test_missing_mitigation_high_risk() {
        let risk = RiskInput::new(Rating::High, Rating::High, Rating::Low);
        let result =
            ComplianceEvaluator::new().evaluate(&checklist(risk, Category::Three, 0.95, 50.0));

        assert!(!result.is_compliant);
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc == "No risk reduction measures provided"));
        assert_eq!(result.value("risk_level"), Some(&DerivedValue::from("High")));
        assert!(result.recommended_actions.contains("risk reduction"));
    }

    #[test]
    fn test_compliant_checklist() {
        let risk = RiskInput::new(Rating::High, Rating::High, Rating::Low)
            .with_mitigation("Interlocked guard");
        let mut checklist = checklist(risk, Category::Three, 0.95, 50.0);
        checklist.iso13849.required_pl = Some(PerformanceLevel::D);
        checklist.items = vec![ChecklistItem::required("V1", "FMEA reviewed").done()];
        checklist.achieved_sil = Some(Sil::Sil2);

        let result = ComplianceEvaluator::new().evaluate(&checklist);
        assert!(result.is_compliant, "{:?}", result.non_conformities);
        assert_eq!(result.value("achieved_pl"), Some(&DerivedValue::from("PLd")));
        assert_eq!(result.value("pl_sil_consistent"), Some(&DerivedValue::Flag(true)));
        assert!(result.summary.starts_with("Compliant"));
    }

    #[test]
    fn test_pl_gap() {
        let risk = RiskInput::new(Rating::High, Rating::High, Rating::High).with_mitigation("Guard");
        // score 18 → PLe required, Cat 3 cannot reach it
        let result =
            ComplianceEvaluator::new().evaluate(&checklist(risk, Category::Three, 0.95, 50.0));
        assert_eq!(result.value("required_pl"), Some(&DerivedValue::from("PLe")));
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc.contains("does not meet required PLe")));
        assert!(result.warnings.iter().any(|w| w.is("W0703")));
    }

    #[test]
    fn test_required_pl_below_risk() {
        let risk = RiskInput::new(Rating::High, Rating::High, Rating::Low).with_mitigation("Guard");
        let mut checklist = checklist(risk, Category::Three, 0.95, 50.0);
        checklist.iso13849.required_pl = Some(PerformanceLevel::B);
        let result = ComplianceEvaluator::new().evaluate(&checklist);
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc.contains("below the PLd derived")));
    }

    #[test]
    fn test_ccf_validation_and_items() {
        let risk = RiskInput::new(Rating::Low, Rating::Low, Rating::Low).with_mitigation("Guard");
        let mut checklist = checklist(risk, Category::Three, 0.95, 50.0);
        checklist.iso13849.ccf_score = 50;
        checklist.iso13849.validation_performed = false;
        checklist.items = vec![
            ChecklistItem::required("D1", "Wiring diagram"),
            ChecklistItem::optional("D2", "Training record"),
        ];

        let result = ComplianceEvaluator::new().evaluate(&checklist);
        assert!(!result.is_compliant);
        assert!(result.non_conformities.iter().any(|nc| nc.contains("CCF score 50")));
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc == "Validation has not been performed"));
        assert!(result.non_conformities.iter().any(|nc| nc.contains("'D1'")));
        assert!(!result.non_conformities.iter().any(|nc| nc.contains("'D2'")));
        assert!(result.warnings.iter().any(|w| w.is("W0702")));
        assert!(result.recommended_actions.contains("EMC"));
    }

    #[test]
    fn test_inconsistent_sil() {
        let risk = RiskInput::new(Rating::Low, Rating::Low, Rating::Low).with_mitigation("Guard");
        let mut checklist = checklist(risk, Category::Three, 0.95, 50.0);
        checklist.achieved_sil = Some(Sil::Sil1);
        let result = ComplianceEvaluator::new().evaluate(&checklist);
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc.contains("inconsistent")));
    }

    #[test]
    fn test_undeterminable_pl() {
        let risk = RiskInput::new(Rating::Low, Rating::Low, Rating::Low).with_mitigation("Guard");
        let result =
            ComplianceEvaluator::new().evaluate(&checklist(risk, Category::B, 0.0, 1.0));
        assert_eq!(result.value("achieved_pl"), Some(&DerivedValue::from("n/a")));
        assert!(result
            .non_conformities
            .iter()
            .any(|nc| nc == "Performance level could not be determined"));
    }

    #[test]
    fn test_report_format() {
        let risk = RiskInput::new(Rating::High, Rating::High, Rating::Low);
        let result =
            ComplianceEvaluator::new().evaluate(&checklist(risk, Category::Three, 0.95, 50.0));
        let report = format_evaluation_report(&result);
        assert!(report.contains("Compliance Evaluation"));
        assert!(report.contains("risk_score"));
        assert!(report.contains("No risk reduction measures provided"));
    }
}
