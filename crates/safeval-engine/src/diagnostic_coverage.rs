//! Diagnostic coverage aggregation (DCavg)
//!
//! Combines per-device DC of devices in series with the coverage contributed
//! by a test channel, then caps the result at a fault-masking upper limit
//! that shrinks with the number of series devices and with low demand.
//!
//! ```text
//! P        = Π (1 - DC_i)                       over valid devices
//! DC_test  = min(cap, coverage * (1 - e^(-r * f)))   with test parameters
//!          = min(cap, r * fallback_factor)           otherwise
//! DC_raw   = 1 - P * (1 - DC_test)
//! DCavg    = min(DC_raw, L(n, r))
//! ```
//!
//! Bad inputs never abort the calculation; they are flagged as warnings and
//! the best-effort value is returned.

use crate::config::{MaskingConfig, TestChannelConfig};
use crate::warning::Warning;
use serde::{Deserialize, Serialize};
use std::fmt;

/// DC of one device in the series path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDc {
    pub device_id: String,
    pub dc: f64,
}

impl DeviceDc {
    pub fn new(device_id: &str, dc: f64) -> Self {
        Self {
            device_id: device_id.to_string(),
            dc,
        }
    }
}

/// Test equipment parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestParameters {
    /// Tests per demand
    pub frequency: f64,
    /// Fraction of dangerous failures the test detects (0.0-1.0)
    pub coverage: f64,
}

/// How much of the derivation to keep in the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetailLevel {
    /// Final values and warnings only
    #[default]
    Summary,
    /// Also record every intermediate step
    Detailed,
}

/// Inputs of one DCavg calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcInput {
    pub devices: Vec<DeviceDc>,
    /// Demand rate r (0.0-1.0)
    pub demand_rate: f64,
    #[serde(default)]
    pub test: Option<TestParameters>,
    /// Series device count used by the masking limit
    pub series_count: usize,
}

impl DcInput {
    /// Input whose series count equals the device count
    pub fn series(devices: Vec<DeviceDc>, demand_rate: f64) -> Self {
        let series_count = devices.len();
        Self {
            devices,
            demand_rate,
            test: None,
            series_count,
        }
    }

    pub fn with_test(mut self, test: TestParameters) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_series_count(mut self, n: usize) -> Self {
        self.series_count = n;
        self
    }
}

/// Diagnostic coverage band (ISO 13849-1 Table 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DcBand {
    /// DC < 60%
    None,
    /// 60% <= DC < 90%
    Low,
    /// 90% <= DC < 99%
    Medium,
    /// DC >= 99%
    High,
}

impl DcBand {
    /// Categorize a DC fraction (0.0-1.0)
    pub fn from_dc(dc: f64) -> Self {
        // tolerate rounding just below a band edge (e.g. 0.9899999999)
        let pct = (dc * 100.0 * 1e6).round() / 1e6;
        if pct >= 99.0 {
            DcBand::High
        } else if pct >= 90.0 {
            DcBand::Medium
        } else if pct >= 60.0 {
            DcBand::Low
        } else {
            DcBand::None
        }
    }
}

impl fmt::Display for DcBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DcBand::None => write!(f, "None (<60%)"),
            DcBand::Low => write!(f, "Low (60-90%)"),
            DcBand::Medium => write!(f, "Medium (90-99%)"),
            DcBand::High => write!(f, "High (≥99%)"),
        }
    }
}

/// One recorded step of the derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationStep {
    pub name: String,
    pub value: f64,
    pub note: String,
}

/// Result of a DCavg calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCoverageResult {
    /// Final DCavg (capped)
    pub dc_avg: f64,
    /// DCavg before the masking cap
    pub raw_dc_avg: f64,
    /// Fault-masking upper limit L(n, r)
    pub masking_limit: f64,
    /// Test-channel contribution
    pub dc_test: f64,
    /// Series product Π(1 - DC_i)
    pub series_product: f64,
    pub band: DcBand,
    /// True when the masking limit reduced the raw value
    pub capped: bool,
    pub warnings: Vec<Warning>,
    /// Remediation proposals
    pub recommendations: Vec<String>,
    /// Intermediate values (empty unless `DetailLevel::Detailed`)
    pub steps: Vec<CalculationStep>,
}

/// DCavg calculator
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCoverageCalculator {
    masking: MaskingConfig,
    test_channel: TestChannelConfig,
    detail: DetailLevel,
}

impl DiagnosticCoverageCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(masking: MaskingConfig, test_channel: TestChannelConfig) -> Self {
        Self {
            masking,
            test_channel,
            detail: DetailLevel::Summary,
        }
    }

    pub fn detailed(mut self) -> Self {
        self.detail = DetailLevel::Detailed;
        self
    }

    pub fn with_detail(mut self, detail: DetailLevel) -> Self {
        self.detail = detail;
        self
    }

    /// Fault-masking upper limit L(n, r)
    ///
    /// Non-increasing in `n`, always within `[floor, base_limit]`.
    pub fn masking_limit(&self, series_count: usize, demand_rate: f64) -> f64 {
        let m = &self.masking;
        let extra_devices = series_count.saturating_sub(1) as f64;
        let penalty = (extra_devices * m.per_device_penalty).min(m.max_penalty);
        let mut limit = m.base_limit - penalty;

        let r = sanitize_rate(demand_rate);
        if r < m.low_demand_threshold {
            limit *= m.low_demand_scale;
        }

        limit.max(m.floor).min(m.base_limit)
    }

    /// Test-channel DC contribution
    pub fn test_coverage(&self, demand_rate: f64, test: Option<&TestParameters>) -> f64 {
        let r = sanitize_rate(demand_rate);
        let dc = match test {
            Some(params) => {
                let coverage = sanitize_fraction(params.coverage);
                let frequency = sanitize_frequency(params.frequency);
                coverage * (1.0 - (-r * frequency).exp())
            }
            None => r * self.test_channel.fallback_factor,
        };
        dc.min(self.test_channel.max_dc).max(0.0)
    }

    /// Compute DCavg for the given input
    pub fn calculate(&self, input: &DcInput) -> DiagnosticCoverageResult {
        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();
        let mut steps = Vec::new();
        let detailed = self.detail == DetailLevel::Detailed;

        // Step 1: validate
        if input.devices.is_empty() {
            warnings.push(Warning::new(
                "W0103",
                "No device DC values supplied; DCavg relies on the test channel only",
            ));
        }

        let r = if !input.demand_rate.is_finite() || !(0.0..=1.0).contains(&input.demand_rate) {
            let clamped = sanitize_rate(input.demand_rate);
            warnings.push(Warning::new(
                "W0102",
                format!(
                    "Demand rate {} is outside [0, 1]; using {}",
                    input.demand_rate, clamped
                ),
            ));
            clamped
        } else {
            input.demand_rate
        };

        if let Some(test) = &input.test {
            if !(0.0..=1.0).contains(&test.coverage) {
                warnings.push(Warning::new(
                    "W0104",
                    format!(
                        "Test coverage {} is outside [0, 1]; using {}",
                        test.coverage,
                        sanitize_fraction(test.coverage)
                    ),
                ));
            }
            if !test.frequency.is_finite() || test.frequency < 0.0 {
                warnings.push(Warning::new(
                    "W0104",
                    format!(
                        "Test frequency {} is not a finite non-negative number; no test credit",
                        test.frequency
                    ),
                ));
            }
        }

        // Step 2: series product over valid devices
        let mut series_product = 1.0;
        for device in &input.devices {
            if device.dc.is_finite() && (0.0..=1.0).contains(&device.dc) {
                series_product *= 1.0 - device.dc;
                if detailed {
                    steps.push(CalculationStep {
                        name: format!("series:{}", device.device_id),
                        value: series_product,
                        note: format!("(1 - {:.4}) applied", device.dc),
                    });
                }
            } else {
                warnings.push(
                    Warning::new(
                        "W0101",
                        format!(
                            "DCavg {} of device '{}' is outside [0, 1]; excluded from the series product",
                            device.dc, device.device_id
                        ),
                    )
                    .about(&device.device_id),
                );
            }
        }
        if detailed {
            steps.push(CalculationStep {
                name: "series_product".to_string(),
                value: series_product,
                note: "Π(1 - DC_i)".to_string(),
            });
        }

        // Step 3: test channel
        let dc_test = self.test_coverage(r, input.test.as_ref());
        if detailed {
            let note = if input.test.is_some() {
                "min(cap, coverage * (1 - e^(-r*f)))"
            } else {
                "min(cap, r * fallback_factor), no test parameters"
            };
            steps.push(CalculationStep {
                name: "dc_test".to_string(),
                value: dc_test,
                note: note.to_string(),
            });
        }

        // Step 4: combine
        let raw_dc_avg = 1.0 - series_product * (1.0 - dc_test);
        if detailed {
            steps.push(CalculationStep {
                name: "raw_dc_avg".to_string(),
                value: raw_dc_avg,
                note: "1 - P * (1 - DC_test)".to_string(),
            });
        }

        // Step 5: masking limit
        let masking_limit = self.masking_limit(input.series_count, r);
        if detailed {
            steps.push(CalculationStep {
                name: "masking_limit".to_string(),
                value: masking_limit,
                note: format!("L(n={}, r={:.3})", input.series_count, r),
            });
        }

        // Step 6: cap
        let capped = raw_dc_avg > masking_limit;
        let dc_avg = raw_dc_avg.min(masking_limit);
        if capped {
            warnings.push(Warning::new(
                "W0105",
                format!(
                    "Fault masking risk: raw DCavg {:.4} exceeds the masking limit {:.4} for {} series devices",
                    raw_dc_avg, masking_limit, input.series_count
                ),
            ));
            recommendations.push("Reduce the number of devices in series".to_string());
            recommendations.push("Increase the test frequency".to_string());
        }
        if detailed {
            steps.push(CalculationStep {
                name: "dc_avg".to_string(),
                value: dc_avg,
                note: "min(DC_raw, L)".to_string(),
            });
        }

        tracing::debug!(
            raw_dc_avg,
            masking_limit,
            dc_avg,
            devices = input.devices.len(),
            "DCavg calculated"
        );

        DiagnosticCoverageResult {
            dc_avg,
            raw_dc_avg,
            masking_limit,
            dc_test,
            series_product,
            band: DcBand::from_dc(dc_avg),
            capped,
            warnings,
            recommendations,
            steps,
        }
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    sanitize_fraction(rate)
}

/// NaN earns nothing; everything else is clamped to [0, 1]
pub(crate) fn sanitize_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn sanitize_frequency(frequency: f64) -> f64 {
    if frequency.is_finite() {
        frequency.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices(dcs: &[f64]) -> Vec<DeviceDc> {
        dcs.iter()
            .enumerate()
            .map(|(i, dc)| DeviceDc::new(&format!("dev-{}", i), *dc))
            .collect()
    }

    #[test]
    fn test_masking_cap_two_devices() {
        let calc = DiagnosticCoverageCalculator::new();
        let result = calc.calculate(&DcInput::series(devices(&[0.99, 0.99]), 1.0));

        assert!((result.raw_dc_avg - 0.99991).abs() < 1e-9);
        assert!(result.masking_limit < 0.99);
        assert!((result.masking_limit - 0.98).abs() < 1e-12);
        assert_eq!(result.dc_avg, result.masking_limit);
        assert!(result.capped);
        assert!(result.warnings.iter().any(|w| w.is("W0105")));
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn test_masking_limit_bounds() {
        let calc = DiagnosticCoverageCalculator::new();
        for r in [0.0, 0.05, 0.1, 0.5, 1.0] {
            let mut previous = f64::INFINITY;
            for n in 0..50 {
                let limit = calc.masking_limit(n, r);
                assert!(limit <= previous);
                assert!((0.5..=0.99).contains(&limit));
                previous = limit;
            }
        }
    }

    #[test]
    fn test_low_demand_scales_limit() {
        let calc = DiagnosticCoverageCalculator::new();
        assert!(calc.masking_limit(1, 0.01) < calc.masking_limit(1, 1.0));
        assert!((calc.masking_limit(1, 0.01) - 0.99 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_floor_applies() {
        let masking = MaskingConfig {
            per_device_penalty: 0.2,
            max_penalty: 0.6,
            ..MaskingConfig::default()
        };
        let calc = DiagnosticCoverageCalculator::with_config(masking, TestChannelConfig::default());
        assert_eq!(calc.masking_limit(10, 0.01), 0.5);
    }

    #[test]
    fn test_capped_dc_never_increases_with_series_devices() {
        let calc = DiagnosticCoverageCalculator::new();
        let mut dcs = Vec::new();
        let mut previous = f64::INFINITY;
        for dc in [0.99, 0.95, 0.9, 0.3, 0.0] {
            dcs.push(dc);
            let result = calc.calculate(&DcInput::series(devices(&dcs), 0.5));
            assert!(result.capped, "n={} raw={}", dcs.len(), result.raw_dc_avg);
            assert_eq!(result.dc_avg, result.masking_limit);
            assert!(result.dc_avg <= previous);
            previous = result.dc_avg;
        }
    }

    #[test]
    fn test_uncapped_series_devices_add_coverage() {
        // below the cap every extra device adds its own diagnostics
        let calc = DiagnosticCoverageCalculator::new();
        let one = calc.calculate(&DcInput::series(devices(&[0.3]), 0.5));
        let two = calc.calculate(&DcInput::series(devices(&[0.3, 0.3]), 0.5));

        assert!(!one.capped && !two.capped);
        assert!((one.dc_avg - 0.335).abs() < 1e-12);
        assert!((two.dc_avg - 0.5345).abs() < 1e-12);
        assert!(two.masking_limit <= one.masking_limit);
        assert!(two.dc_avg <= two.masking_limit);
    }

    #[test]
    fn test_dc_never_exceeds_masking_limit() {
        let calc = DiagnosticCoverageCalculator::new();
        for r in [0.0, 0.05, 0.5, 1.0] {
            let layouts: [&[f64]; 4] = [&[0.3], &[0.99, 0.99], &[0.6, 0.9, 0.95, 0.99], &[]];
            for dcs in layouts {
                for n in [0usize, 1, 4, 20] {
                    let input = DcInput::series(devices(dcs), r).with_series_count(n);
                    let result = calc.calculate(&input);
                    assert!(result.dc_avg <= result.masking_limit);
                    assert!(result.dc_avg <= result.raw_dc_avg);
                }
            }
        }
    }

    #[test]
    fn test_explicit_test_parameters() {
        let calc = DiagnosticCoverageCalculator::new();
        let test = TestParameters {
            frequency: 100.0,
            coverage: 0.9,
        };
        assert!((calc.test_coverage(1.0, Some(&test)) - 0.9).abs() < 1e-6);

        let full = TestParameters {
            frequency: 100.0,
            coverage: 1.0,
        };
        assert_eq!(calc.test_coverage(1.0, Some(&full)), 0.99);
        assert!((calc.test_coverage(0.5, None) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_values_are_flagged() {
        let calc = DiagnosticCoverageCalculator::new();
        let input = DcInput::series(devices(&[0.9, 1.5, -0.1]), 2.0);
        let result = calc.calculate(&input);

        let flagged = result.warnings.iter().filter(|w| w.is("W0101")).count();
        assert_eq!(flagged, 2);
        assert!(result.warnings.iter().any(|w| w.is("W0102")));
        // only the 0.9 device contributes
        assert!((result.series_product - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_test_parameters_earn_no_credit() {
        let calc = DiagnosticCoverageCalculator::new();
        let nan_coverage = TestParameters {
            frequency: 100.0,
            coverage: f64::NAN,
        };
        assert_eq!(calc.test_coverage(1.0, Some(&nan_coverage)), 0.0);

        let infinite_frequency = TestParameters {
            frequency: f64::INFINITY,
            coverage: 0.9,
        };
        assert_eq!(calc.test_coverage(1.0, Some(&infinite_frequency)), 0.0);

        let result =
            calc.calculate(&DcInput::series(devices(&[0.9]), 1.0).with_test(nan_coverage));
        assert!(result.warnings.iter().any(|w| w.is("W0104")));
        assert_eq!(result.dc_test, 0.0);
        assert!((result.raw_dc_avg - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_device_dc_and_rate() {
        let calc = DiagnosticCoverageCalculator::new();
        let input = DcInput::series(devices(&[f64::NAN, 0.9, f64::INFINITY]), f64::NAN);
        let result = calc.calculate(&input);

        assert_eq!(result.warnings.iter().filter(|w| w.is("W0101")).count(), 2);
        assert!(result.warnings.iter().any(|w| w.is("W0102")));
        assert!((result.series_product - 0.1).abs() < 1e-12);
        // NaN demand counts as zero demand: no fallback credit, low-demand limit
        assert_eq!(result.dc_test, 0.0);
        assert!((result.masking_limit - 0.97 * 0.9).abs() < 1e-12);
        assert!(result.dc_avg.is_finite());
    }

    #[test]
    fn test_empty_devices() {
        let calc = DiagnosticCoverageCalculator::new();
        let result = calc.calculate(&DcInput::series(Vec::new(), 1.0));
        assert!(result.warnings.iter().any(|w| w.is("W0103")));
        assert!((result.dc_avg - 0.1).abs() < 1e-12);
        assert_eq!(result.band, DcBand::None);
    }

    #[test]
    fn test_detailed_records_steps() {
        let calc = DiagnosticCoverageCalculator::new().detailed();
        let result = calc.calculate(&DcInput::series(devices(&[0.9, 0.9]), 1.0));
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "series:dev-0",
                "series:dev-1",
                "series_product",
                "dc_test",
                "raw_dc_avg",
                "masking_limit",
                "dc_avg"
            ]
        );

        let summary = DiagnosticCoverageCalculator::new()
            .calculate(&DcInput::series(devices(&[0.9, 0.9]), 1.0));
        assert!(summary.steps.is_empty());
        assert_eq!(summary.dc_avg, result.dc_avg);
    }

    #[test]
    fn test_dc_band() {
        assert_eq!(DcBand::from_dc(0.5), DcBand::None);
        assert_eq!(DcBand::from_dc(0.6), DcBand::Low);
        assert_eq!(DcBand::from_dc(0.9), DcBand::Medium);
        assert_eq!(DcBand::from_dc(0.99), DcBand::High);
        assert_eq!(DcBand::from_dc(0.98), DcBand::Medium);
    }
}
