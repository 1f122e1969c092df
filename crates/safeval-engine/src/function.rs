//! End-to-end evaluation of a safety function description
//!
//! Resolves device references, derives the inputs of every leaf calculator
//! from the channel layout and combines the results into achieved PL,
//! achieved SIL and their cross-check.

use crate::category::{CategoryAdvice, CategoryAdvisor, CategorySignals};
use crate::ccf::{CcfAssessment, CcfScorer};
use crate::config::EngineConfig;
use crate::consistency::{check_consistency, ConsistencyCheckResult};
use crate::diagnostic_coverage::{
    DcInput, DetailLevel, DeviceDc, DiagnosticCoverageCalculator, DiagnosticCoverageResult,
};
use crate::levels::{PerformanceLevel, Sil};
use crate::library::{ComponentLibrary, FunctionRepository};
use crate::model::{DeviceSpec, SafetyFunctionSpec, Stage, HOURS_PER_YEAR};
use crate::performance_level::{
    determine_performance_level, series_mttfd, symmetrised_mttfd, Iso13849Parameters,
    PlDetermination,
};
use crate::pfhd::{PfhdAggregator, PfhdResult};
use crate::warning::Warning;
use crate::{EngineError, EngineResult, EntityKind};
use serde::{Deserialize, Serialize};

/// Everything derived for one safety function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEvaluation {
    pub function_id: String,
    pub name: String,
    pub diagnostic_coverage: DiagnosticCoverageResult,
    pub ccf: CcfAssessment,
    pub category: CategoryAdvice,
    /// MTTFd per channel after symmetrisation (years)
    pub channel_mttfd_years: f64,
    pub performance_level: PlDetermination,
    pub pfhd: PfhdResult,
    pub consistency: ConsistencyCheckResult,
    pub target_pl: Option<PerformanceLevel>,
    pub target_sil: Option<Sil>,
    /// `None` when the function has no target PL
    pub target_pl_met: Option<bool>,
    /// `None` when the function has no target SIL
    pub target_sil_met: Option<bool>,
    /// Findings about the channel layout itself
    pub warnings: Vec<Warning>,
}

impl FunctionEvaluation {
    /// All targets that are set are met
    pub fn meets_targets(&self) -> bool {
        self.target_pl_met.unwrap_or(true) && self.target_sil_met.unwrap_or(true)
    }

    /// Every warning from every calculator, in evaluation order
    pub fn all_warnings(&self) -> Vec<&Warning> {
        self.warnings
            .iter()
            .chain(&self.diagnostic_coverage.warnings)
            .chain(&self.ccf.warnings)
            .chain(&self.category.warnings)
            .chain(&self.performance_level.warnings)
            .chain(&self.pfhd.warnings)
            .chain(&self.consistency.warnings)
            .collect()
    }
}

/// Evaluator for [`SafetyFunctionSpec`]s
#[derive(Debug, Clone, Default)]
pub struct SafetyFunctionEvaluator {
    config: EngineConfig,
    detail: DetailLevel,
}

impl SafetyFunctionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            detail: DetailLevel::Summary,
        }
    }

    pub fn with_detail(mut self, detail: DetailLevel) -> Self {
        self.detail = detail;
        self
    }

    /// Look up a function by id and evaluate it
    pub fn evaluate_by_id(
        &self,
        repository: &dyn FunctionRepository,
        library: &dyn ComponentLibrary,
        function_id: &str,
    ) -> EngineResult<FunctionEvaluation> {
        let function = repository
            .function(function_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::SafetyFunction, function_id))?;
        self.evaluate(function, library)
    }

    /// Evaluate a function description
    pub fn evaluate(
        &self,
        function: &SafetyFunctionSpec,
        library: &dyn ComponentLibrary,
    ) -> EngineResult<FunctionEvaluation> {
        tracing::info!(function = %function.id, "evaluating safety function");

        let resolved = ResolvedStages::resolve(function, library)?;
        let mut warnings = Vec::new();

        for (name, stage) in function.stages() {
            if stage.channels.is_empty() {
                warnings.push(
                    Warning::new(
                        "W0606",
                        format!("Function '{}' has no {} channels", function.id, name),
                    )
                    .about(&function.id),
                );
            }
        }

        // Diagnostic coverage along the first channel of every stage
        let dc_input = self.dc_input(function, &resolved);
        let diagnostic_coverage = DiagnosticCoverageCalculator::with_config(
            self.config.masking.clone(),
            self.config.test_channel.clone(),
        )
        .with_detail(self.detail)
        .calculate(&dc_input);

        let ccf = CcfScorer::new().assess(&function.ccf_measures);

        let signals = category_signals(function, ccf.score);
        let category = CategoryAdvisor::with_weights(self.config.category.clone())
            .advise(&signals, None);

        let channel_mttfd_hours = resolved.function_mttfd_hours();
        let performance_level = determine_performance_level(&Iso13849Parameters {
            required_pl: function.target_pl,
            category: category.highest_category(),
            dc_avg: diagnostic_coverage.dc_avg,
            mttfd_hours: channel_mttfd_hours,
            ccf_score: ccf.score,
            validation_performed: false,
        });

        let pfhd =
            PfhdAggregator::with_config(self.config.pfhd.clone()).aggregate(&function.subsystems);

        let consistency = check_consistency(performance_level.achieved, pfhd.achieved_sil);

        let target_pl_met = function.target_pl.map(|pl| performance_level.meets(pl));
        let target_sil_met = function
            .target_sil
            .map(|target| pfhd.achieved_sil.map(|sil| sil >= target).unwrap_or(false));

        tracing::info!(
            function = %function.id,
            achieved_pl = ?performance_level.achieved,
            achieved_sil = ?pfhd.achieved_sil,
            "safety function evaluated"
        );

        Ok(FunctionEvaluation {
            function_id: function.id.clone(),
            name: function.name.clone(),
            diagnostic_coverage,
            ccf,
            category,
            channel_mttfd_years: channel_mttfd_hours / HOURS_PER_YEAR,
            performance_level,
            pfhd,
            consistency,
            target_pl: function.target_pl,
            target_sil: function.target_sil,
            target_pl_met,
            target_sil_met,
            warnings,
        })
    }

    fn dc_input(&self, function: &SafetyFunctionSpec, resolved: &ResolvedStages<'_>) -> DcInput {
        let devices: Vec<DeviceDc> = resolved
            .stages
            .iter()
            .filter_map(|channels| channels.first())
            .flat_map(|channel| channel.iter())
            .map(|device| DeviceDc::new(&device.id, device.dc_avg))
            .collect();

        let series_count: usize = function
            .stages()
            .iter()
            .map(|(_, stage)| stage.series_length())
            .sum();

        let demand_rate = function
            .stages()
            .iter()
            .filter_map(|(_, stage)| stage.options.demand_rate)
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))))
            .unwrap_or(1.0);

        DcInput {
            devices,
            demand_rate,
            test: function.test_equipment,
            series_count,
        }
    }
}

fn category_signals(function: &SafetyFunctionSpec, ccf_score: u32) -> CategorySignals {
    let monitored = |stage: &Stage| stage.options.monitoring.is_monitored();
    CategorySignals {
        input_channels: function.input.channel_count(),
        logic_channels: function.logic.channel_count(),
        output_channels: function.output.channel_count(),
        input_monitored: monitored(&function.input),
        logic_monitored: monitored(&function.logic),
        output_monitored: monitored(&function.output),
        has_test_equipment: function.test_equipment.is_some(),
        ccf_score,
    }
}

/// Device references resolved per stage and channel
struct ResolvedStages<'a> {
    stages: Vec<Vec<Vec<&'a DeviceSpec>>>,
}

impl<'a> ResolvedStages<'a> {
    fn resolve(
        function: &SafetyFunctionSpec,
        library: &'a dyn ComponentLibrary,
    ) -> EngineResult<Self> {
        let mut stages = Vec::new();
        for (_, stage) in function.stages() {
            let mut channels = Vec::new();
            for channel in &stage.channels {
                let devices = channel
                    .devices
                    .iter()
                    .map(|id| {
                        library
                            .device(id)
                            .ok_or_else(|| EngineError::not_found(EntityKind::Device, id))
                    })
                    .collect::<EngineResult<Vec<_>>>()?;
                channels.push(devices);
            }
            stages.push(channels);
        }
        Ok(Self { stages })
    }

    /// Channel MTTFd of the whole function (hours)
    ///
    /// Each channel is a series of devices; parallel channels of a stage are
    /// symmetrised; stages combine in series.
    fn function_mttfd_hours(&self) -> f64 {
        let stage_values: Vec<f64> = self
            .stages
            .iter()
            .filter(|channels| !channels.is_empty())
            .map(|channels| {
                channels
                    .iter()
                    .map(|devices| {
                        let hours: Vec<f64> = devices.iter().map(|d| d.mttfd_hours).collect();
                        series_mttfd(&hours)
                    })
                    .reduce(symmetrised_mttfd)
                    .unwrap_or(0.0)
            })
            .collect();

        if stage_values.iter().any(|v| *v <= 0.0) {
            return 0.0;
        }
        series_mttfd(&stage_values)
    }
}
