//! PFHd aggregation and achieved SIL (IEC 62061 / IEC 61508-6 simplified)
//!
//! Each subsystem's PFHd is computed by the formula registered for its
//! architecture in [`ARCHITECTURE_PROFILES`]; the function's total PFHd is the
//! sum over subsystems and the achieved SIL follows from the fixed band table
//! in [`Sil::pfhd_band`].
//!
//! ```text
//! 1oo1, 2oo2 : Σ λi
//! 1oo2       : (1-β)² λ1 λ2 T1   + β (λ1 + λ2) / 2
//! 1oo2D      : (1-β)² λ1 λ2 Teff + β (λ1 + λ2) / 2,  Teff = DC T2 + (1-DC) T1
//! 2oo3       : (1-β)² (λ1λ2 + λ1λ3 + λ2λ3) T1 + β mean(λ)
//! ```

use crate::config::PfhdConfig;
use crate::diagnostic_coverage::sanitize_fraction;
use crate::levels::{PerformanceLevel, Sil};
use crate::model::SubsystemSpec;
use crate::warning::Warning;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subsystem architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "1oo1")]
    OneOoOne,
    #[serde(rename = "1oo2")]
    OneOoTwo,
    #[serde(rename = "1oo2D")]
    OneOoTwoD,
    #[serde(rename = "2oo2")]
    TwoOoTwo,
    #[serde(rename = "2oo3")]
    TwoOoThree,
}

impl Architecture {
    pub const ALL: [Architecture; 5] = [
        Architecture::OneOoOne,
        Architecture::OneOoTwo,
        Architecture::OneOoTwoD,
        Architecture::TwoOoTwo,
        Architecture::TwoOoThree,
    ];

    pub fn tag(&self) -> &'static str {
        self.profile().tag
    }

    pub fn profile(&self) -> &'static ArchitectureProfile {
        // table is indexed in declaration order
        &ARCHITECTURE_PROFILES[*self as usize]
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .iter()
            .copied()
            .find(|a| a.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown architecture '{}'", s))
    }
}

/// Values fed to an architecture formula
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaInputs {
    /// Per-channel dangerous failure rates
    pub lambdas: Vec<f64>,
    pub beta: f64,
    /// Mean diagnostic coverage of the channels
    pub dc: f64,
    /// Proof-test interval T1 (hours)
    pub proof_test_interval: f64,
    /// Diagnostic test interval T2 (hours)
    pub diagnostic_interval: f64,
}

type PfhdFormula = fn(&FormulaInputs) -> f64;

/// Static description of an architecture
#[derive(Debug)]
pub struct ArchitectureProfile {
    pub architecture: Architecture,
    pub tag: &'static str,
    /// Channels the formula expects; `None` accepts any count
    pub channels: Option<usize>,
    pub fault_tolerance: u32,
    pub uses_diagnostics: bool,
    pub formula: PfhdFormula,
}

impl ArchitectureProfile {
    pub fn is_redundant(&self) -> bool {
        self.fault_tolerance > 0
    }
}

pub static ARCHITECTURE_PROFILES: [ArchitectureProfile; 5] = [
    ArchitectureProfile {
        architecture: Architecture::OneOoOne,
        tag: "1oo1",
        channels: None,
        fault_tolerance: 0,
        uses_diagnostics: false,
        formula: series_sum,
    },
    ArchitectureProfile {
        architecture: Architecture::OneOoTwo,
        tag: "1oo2",
        channels: Some(2),
        fault_tolerance: 1,
        uses_diagnostics: false,
        formula: one_out_of_two,
    },
    ArchitectureProfile {
        architecture: Architecture::OneOoTwoD,
        tag: "1oo2D",
        channels: Some(2),
        fault_tolerance: 1,
        uses_diagnostics: true,
        formula: one_out_of_two_diagnosed,
    },
    ArchitectureProfile {
        architecture: Architecture::TwoOoTwo,
        tag: "2oo2",
        channels: Some(2),
        fault_tolerance: 0,
        uses_diagnostics: false,
        formula: series_sum,
    },
    ArchitectureProfile {
        architecture: Architecture::TwoOoThree,
        tag: "2oo3",
        channels: Some(3),
        fault_tolerance: 1,
        uses_diagnostics: false,
        formula: two_out_of_three,
    },
];

fn series_sum(inputs: &FormulaInputs) -> f64 {
    inputs.lambdas.iter().sum()
}

fn one_out_of_two(inputs: &FormulaInputs) -> f64 {
    let (l1, l2) = (inputs.lambdas[0], inputs.lambdas[1]);
    let independent = (1.0 - inputs.beta).powi(2);
    independent * l1 * l2 * inputs.proof_test_interval + inputs.beta * (l1 + l2) / 2.0
}

fn one_out_of_two_diagnosed(inputs: &FormulaInputs) -> f64 {
    let (l1, l2) = (inputs.lambdas[0], inputs.lambdas[1]);
    let dc = inputs.dc.clamp(0.0, 1.0);
    let t_eff = dc * inputs.diagnostic_interval + (1.0 - dc) * inputs.proof_test_interval;
    let independent = (1.0 - inputs.beta).powi(2);
    independent * l1 * l2 * t_eff + inputs.beta * (l1 + l2) / 2.0
}

fn two_out_of_three(inputs: &FormulaInputs) -> f64 {
    let (l1, l2, l3) = (inputs.lambdas[0], inputs.lambdas[1], inputs.lambdas[2]);
    let pairs = l1 * l2 + l1 * l3 + l2 * l3;
    let mean = (l1 + l2 + l3) / 3.0;
    let independent = (1.0 - inputs.beta).powi(2);
    independent * pairs * inputs.proof_test_interval + inputs.beta * mean
}

/// PFHd contribution of one subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemPfhd {
    pub subsystem_id: String,
    pub architecture: Architecture,
    pub pfhd: f64,
    /// β actually used
    pub beta: f64,
    /// Formula fell back to the series sum
    pub fallback: bool,
    /// At least one device carried a usable PFHd
    pub has_data: bool,
}

/// Aggregated PFHd of a safety function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfhdResult {
    pub total_pfhd: f64,
    pub achieved_sil: Option<Sil>,
    /// PL implied by the total PFHd
    pub implied_pl: Option<PerformanceLevel>,
    pub subsystems: Vec<SubsystemPfhd>,
    pub warnings: Vec<Warning>,
}

/// PFHd aggregator
#[derive(Debug, Clone, Default)]
pub struct PfhdAggregator {
    config: PfhdConfig,
}

impl PfhdAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PfhdConfig) -> Self {
        Self { config }
    }

    /// PFHd of a single subsystem
    pub fn subsystem_pfhd(
        &self,
        subsystem: &SubsystemSpec,
        warnings: &mut Vec<Warning>,
    ) -> SubsystemPfhd {
        let profile = subsystem.architecture.profile();

        if subsystem.devices.is_empty() {
            warnings.push(
                Warning::new(
                    "W0203",
                    format!(
                        "Subsystem '{}' has no devices and contributes no PFHd",
                        subsystem.id
                    ),
                )
                .about(&subsystem.id),
            );
            return SubsystemPfhd {
                subsystem_id: subsystem.id.clone(),
                architecture: subsystem.architecture,
                pfhd: 0.0,
                beta: 0.0,
                fallback: false,
                has_data: false,
            };
        }

        let mut has_data = false;
        let lambdas: Vec<f64> = subsystem
            .devices
            .iter()
            .map(|device| {
                if device.pfhd.is_finite() && device.pfhd > 0.0 {
                    has_data = true;
                    device.pfhd
                } else {
                    warnings.push(
                        Warning::new(
                            "W0201",
                            format!(
                                "Device '{}' in subsystem '{}' has no valid PFHd ({})",
                                device.id, subsystem.id, device.pfhd
                            ),
                        )
                        .about(&device.id),
                    );
                    0.0
                }
            })
            .collect();

        let beta = self.resolve_beta(subsystem, profile, warnings);
        let dc = mean(subsystem.devices.iter().map(|device| {
            let dc = sanitize_fraction(device.dc_avg);
            // NaN never compares equal, so it is reported too
            if profile.uses_diagnostics && dc != device.dc_avg {
                warnings.push(
                    Warning::new(
                        "W0208",
                        format!(
                            "DC {} of device '{}' is outside [0, 1]; using {}",
                            device.dc_avg, device.id, dc
                        ),
                    )
                    .about(&device.id),
                );
            }
            dc
        }));

        let inputs = FormulaInputs {
            lambdas,
            beta,
            dc,
            proof_test_interval: self.config.proof_test_interval_hours,
            diagnostic_interval: self.config.diagnostic_test_interval_hours,
        };

        let (pfhd, fallback) = match profile.channels {
            Some(expected) if expected != inputs.lambdas.len() => {
                warnings.push(
                    Warning::new(
                        "W0204",
                        format!(
                            "Architecture {} expects {} channels but subsystem '{}' has {}; using the series sum",
                            profile.tag,
                            expected,
                            subsystem.id,
                            inputs.lambdas.len()
                        ),
                    )
                    .about(&subsystem.id),
                );
                (series_sum(&inputs), true)
            }
            _ => ((profile.formula)(&inputs), false),
        };

        tracing::debug!(
            subsystem = %subsystem.id,
            architecture = profile.tag,
            pfhd,
            beta,
            "subsystem PFHd"
        );

        SubsystemPfhd {
            subsystem_id: subsystem.id.clone(),
            architecture: subsystem.architecture,
            pfhd,
            beta,
            fallback,
            has_data,
        }
    }

    fn resolve_beta(
        &self,
        subsystem: &SubsystemSpec,
        profile: &ArchitectureProfile,
        warnings: &mut Vec<Warning>,
    ) -> f64 {
        let mut beta: f64 = 0.0;
        for device in &subsystem.devices {
            if !device.beta.is_finite() || !(0.0..=1.0).contains(&device.beta) {
                warnings.push(
                    Warning::new(
                        "W0205",
                        format!(
                            "β {} of device '{}' is outside [0, 1]; clamped",
                            device.beta, device.id
                        ),
                    )
                    .about(&device.id),
                );
            }
            let clamped = if device.beta.is_nan() {
                0.0
            } else {
                device.beta.clamp(0.0, 1.0)
            };
            beta = beta.max(clamped);
        }

        if profile.is_redundant() && beta == 0.0 {
            warnings.push(
                Warning::new(
                    "W0202",
                    format!(
                        "No β specified for redundant subsystem '{}'; using default {}",
                        subsystem.id, self.config.default_beta
                    ),
                )
                .about(&subsystem.id),
            );
            beta = self.config.default_beta;
        }
        beta
    }

    /// Total PFHd and achieved SIL over all subsystems
    pub fn aggregate(&self, subsystems: &[SubsystemSpec]) -> PfhdResult {
        let mut warnings = Vec::new();

        if subsystems.is_empty() {
            warnings.push(Warning::new(
                "W0206",
                "No subsystems supplied; PFHd-based evaluation is not possible",
            ));
        }

        let breakdown: Vec<SubsystemPfhd> = subsystems
            .iter()
            .map(|s| self.subsystem_pfhd(s, &mut warnings))
            .collect();

        let total_pfhd: f64 = breakdown.iter().map(|s| s.pfhd).sum();
        let any_data = breakdown.iter().any(|s| s.has_data);

        let (achieved_sil, implied_pl) = if any_data {
            (Sil::from_pfhd(total_pfhd), PerformanceLevel::from_pfhd(total_pfhd))
        } else {
            (None, None)
        };

        if any_data && achieved_sil.is_none() {
            warnings.push(Warning::new(
                "W0207",
                format!(
                    "Total PFHd {:.3e} exceeds the SIL1 limit of {:.0e}",
                    total_pfhd,
                    Sil::Sil1.max_pfhd()
                ),
            ));
        }

        tracing::debug!(total_pfhd, sil = ?achieved_sil, "PFHd aggregated");

        PfhdResult {
            total_pfhd,
            achieved_sil,
            implied_pl,
            subsystems: breakdown,
            warnings,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceSpec;

    fn subsystem(id: &str, architecture: Architecture, pfhds: &[f64]) -> SubsystemSpec {
        let mut s = SubsystemSpec::new(id, architecture);
        for (i, pfhd) in pfhds.iter().enumerate() {
            s = s.with_device(DeviceSpec::new(&format!("{}-{}", id, i)).with_pfhd(*pfhd));
        }
        s
    }

    #[test]
    fn test_profile_table_matches_declaration_order() {
        for architecture in Architecture::ALL {
            assert_eq!(architecture.profile().architecture, architecture);
        }
    }

    #[test]
    fn test_two_1oo1_subsystems_reach_sil2() {
        let subsystems = vec![
            subsystem("s1", Architecture::OneOoOne, &[1e-7]),
            subsystem("s2", Architecture::OneOoOne, &[1e-7]),
        ];
        let result = PfhdAggregator::new().aggregate(&subsystems);
        assert!((result.total_pfhd - 2e-7).abs() < 1e-20);
        assert_eq!(result.achieved_sil, Some(Sil::Sil2));
        assert_eq!(result.implied_pl, Some(PerformanceLevel::D));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_additive_across_subsystems() {
        let aggregator = PfhdAggregator::new();
        let a = subsystem("a", Architecture::OneOoTwo, &[1e-6, 2e-6]);
        let b = subsystem("b", Architecture::OneOoOne, &[3e-8, 1e-8]);

        let pa = aggregator.aggregate(std::slice::from_ref(&a)).total_pfhd;
        let pb = aggregator.aggregate(std::slice::from_ref(&b)).total_pfhd;
        let both = aggregator.aggregate(&[a, b]).total_pfhd;
        assert!((both - (pa + pb)).abs() < 1e-20);
    }

    #[test]
    fn test_1oo2_formula() {
        let s = SubsystemSpec::new("r", Architecture::OneOoTwo)
            .with_device(DeviceSpec::new("r0").with_pfhd(1e-6).with_beta(0.05))
            .with_device(DeviceSpec::new("r1").with_pfhd(1e-6).with_beta(0.05));
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);

        let expected = 0.95_f64.powi(2) * 1e-6 * 1e-6 * 8760.0 + 0.05 * 1e-6;
        assert!((result.pfhd - expected).abs() < 1e-18);
        assert!(warnings.is_empty());
        assert!(!result.fallback);
    }

    #[test]
    fn test_diagnostics_lower_1oo2d() {
        let aggregator = PfhdAggregator::new();
        let build = |architecture| {
            let mut s = SubsystemSpec::new("d", architecture);
            for i in 0..2 {
                s = s.with_device(
                    DeviceSpec::new(&format!("d{}", i))
                        .with_pfhd(5e-6)
                        .with_beta(0.02)
                        .with_dc(0.9),
                );
            }
            s
        };
        let mut warnings = Vec::new();
        let plain = aggregator.subsystem_pfhd(&build(Architecture::OneOoTwo), &mut warnings);
        let diagnosed = aggregator.subsystem_pfhd(&build(Architecture::OneOoTwoD), &mut warnings);
        assert!(diagnosed.pfhd < plain.pfhd);
    }

    #[test]
    fn test_2oo3_formula() {
        let mut s = SubsystemSpec::new("v", Architecture::TwoOoThree);
        for i in 0..3 {
            s = s.with_device(DeviceSpec::new(&format!("v{}", i)).with_pfhd(1e-6).with_beta(0.1));
        }
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);
        let expected = 0.81 * 3.0 * 1e-12 * 8760.0 + 0.1 * 1e-6;
        assert!((result.pfhd - expected).abs() < 1e-18);
    }

    #[test]
    fn test_channel_mismatch_falls_back() {
        let s = subsystem("m", Architecture::OneOoTwo, &[1e-7, 1e-7, 1e-7]);
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);
        assert!(result.fallback);
        assert!((result.pfhd - 3e-7).abs() < 1e-20);
        assert!(warnings.iter().any(|w| w.is("W0204")));
    }

    #[test]
    fn test_2oo2_is_series_sum() {
        let s = subsystem("p", Architecture::TwoOoTwo, &[2e-8, 3e-8]);
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);
        assert!((result.pfhd - 5e-8).abs() < 1e-20);
        assert!(!result.fallback);
        // no fault tolerance, so no default β either
        assert!(warnings.is_empty());
        assert_eq!(result.beta, 0.0);

        let short = subsystem("q", Architecture::TwoOoTwo, &[2e-8]);
        let result = PfhdAggregator::new().subsystem_pfhd(&short, &mut warnings);
        assert!(result.fallback);
        assert!(warnings.iter().any(|w| w.is("W0204")));
    }

    #[test]
    fn test_1oo2d_channel_mismatch_falls_back() {
        let mut s = SubsystemSpec::new("d", Architecture::OneOoTwoD);
        for i in 0..3 {
            s = s.with_device(
                DeviceSpec::new(&format!("d{}", i))
                    .with_pfhd(1e-7)
                    .with_beta(0.05)
                    .with_dc(0.9),
            );
        }
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);
        assert!(result.fallback);
        assert!((result.pfhd - 3e-7).abs() < 1e-20);
        assert!(warnings.iter().any(|w| w.is("W0204")));
    }

    #[test]
    fn test_non_finite_inputs_degrade() {
        let s = SubsystemSpec::new("n", Architecture::OneOoTwoD)
            .with_device(
                DeviceSpec::new("n0")
                    .with_pfhd(f64::NAN)
                    .with_beta(f64::NAN)
                    .with_dc(f64::NAN),
            )
            .with_device(
                DeviceSpec::new("n1")
                    .with_pfhd(1e-6)
                    .with_beta(0.05)
                    .with_dc(0.9),
            );
        let result = PfhdAggregator::new().aggregate(&[s]);

        assert!(result.total_pfhd.is_finite());
        assert!(result.warnings.iter().any(|w| w.is("W0201")));
        assert!(result.warnings.iter().any(|w| w.is("W0205")));
        assert!(result.warnings.iter().any(|w| w.is("W0208")));
        // NaN β ignored, the other device's β is used
        assert_eq!(result.subsystems[0].beta, 0.05);
        // λ1 = 0 leaves only the common-cause term
        assert!((result.total_pfhd - 0.05 * 1e-6 / 2.0).abs() < 1e-20);
        assert_eq!(result.achieved_sil, Some(Sil::Sil3));
    }

    #[test]
    fn test_nan_dc_treated_as_undiagnosed() {
        let build = |dc: f64| {
            SubsystemSpec::new("d", Architecture::OneOoTwoD)
                .with_device(DeviceSpec::new("d0").with_pfhd(5e-6).with_beta(0.02).with_dc(dc))
                .with_device(DeviceSpec::new("d1").with_pfhd(5e-6).with_beta(0.02).with_dc(dc))
        };
        let aggregator = PfhdAggregator::new();
        let mut warnings = Vec::new();
        let nan = aggregator.subsystem_pfhd(&build(f64::NAN), &mut warnings);
        let zero = aggregator.subsystem_pfhd(&build(0.0), &mut Vec::new());

        assert_eq!(nan.pfhd, zero.pfhd);
        assert_eq!(warnings.iter().filter(|w| w.is("W0208")).count(), 2);
    }

    #[test]
    fn test_beta_out_of_range_is_clamped() {
        let s = SubsystemSpec::new("b", Architecture::OneOoTwo)
            .with_device(DeviceSpec::new("b0").with_pfhd(1e-7).with_beta(1.5))
            .with_device(DeviceSpec::new("b1").with_pfhd(1e-7).with_beta(-0.2));
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);

        assert_eq!(warnings.iter().filter(|w| w.is("W0205")).count(), 2);
        assert_eq!(result.beta, 1.0);
        // β = 1: only the common-cause term remains
        assert!((result.pfhd - 1e-7).abs() < 1e-20);
    }

    #[test]
    fn test_default_beta_for_redundant() {
        let s = subsystem("b", Architecture::OneOoTwo, &[1e-7, 1e-7]);
        let mut warnings = Vec::new();
        let result = PfhdAggregator::new().subsystem_pfhd(&s, &mut warnings);
        assert_eq!(result.beta, 0.1);
        assert!(warnings.iter().any(|w| w.is("W0202")));
    }

    #[test]
    fn test_missing_pfhd_warns() {
        let result =
            PfhdAggregator::new().aggregate(&[subsystem("z", Architecture::OneOoOne, &[0.0])]);
        assert!(result.warnings.iter().any(|w| w.is("W0201")));
        assert_eq!(result.achieved_sil, None);
        assert_eq!(result.total_pfhd, 0.0);
    }

    #[test]
    fn test_empty_inputs_warn() {
        let result = PfhdAggregator::new().aggregate(&[]);
        assert!(result.warnings.iter().any(|w| w.is("W0206")));

        let result =
            PfhdAggregator::new().aggregate(&[SubsystemSpec::new("e", Architecture::OneOoOne)]);
        assert!(result.warnings.iter().any(|w| w.is("W0203")));
    }

    #[test]
    fn test_sil_non_increasing_in_pfhd() {
        let aggregator = PfhdAggregator::new();
        let mut previous: Option<Sil> = Some(Sil::Sil3);
        let mut pfhd = 1e-9;
        while pfhd < 1e-4 {
            let sil = aggregator
                .aggregate(&[subsystem("s", Architecture::OneOoOne, &[pfhd])])
                .achieved_sil;
            assert!(sil <= previous);
            previous = sil;
            pfhd *= 1.5;
        }
        assert_eq!(previous, None);
    }

    #[test]
    fn test_parse_architecture() {
        assert_eq!("1oo2d".parse::<Architecture>(), Ok(Architecture::OneOoTwoD));
        assert_eq!("2oo3".parse::<Architecture>(), Ok(Architecture::TwoOoThree));
        assert!("3oo4".parse::<Architecture>().is_err());
    }
}
