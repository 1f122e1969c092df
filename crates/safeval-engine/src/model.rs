//! Input value objects supplied by the component library and project store

use crate::ccf::CcfMeasure;
use crate::diagnostic_coverage::TestParameters;
use crate::levels::{PerformanceLevel, Sil};
use crate::pfhd::Architecture;
use serde::{Deserialize, Serialize};

/// Hours per year used for MTTFd conversions
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Reliability data of a single device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: String,
    /// Mean time to dangerous failure (hours)
    pub mttfd_hours: f64,
    /// Diagnostic coverage (0.0-1.0)
    pub dc_avg: f64,
    /// Probability of dangerous failure per hour
    pub pfhd: f64,
    /// Common cause factor (0.0-1.0)
    #[serde(default)]
    pub beta: f64,
}

impl DeviceSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            mttfd_hours: 0.0,
            dc_avg: 0.0,
            pfhd: 0.0,
            beta: 0.0,
        }
    }

    pub fn with_mttfd_hours(mut self, hours: f64) -> Self {
        self.mttfd_hours = hours;
        self
    }

    pub fn with_mttfd_years(self, years: f64) -> Self {
        self.with_mttfd_hours(years * HOURS_PER_YEAR)
    }

    pub fn with_dc(mut self, dc: f64) -> Self {
        self.dc_avg = dc;
        self
    }

    pub fn with_pfhd(mut self, pfhd: f64) -> Self {
        self.pfhd = pfhd;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn mttfd_years(&self) -> f64 {
        self.mttfd_hours / HOURS_PER_YEAR
    }
}

/// A subsystem contributing to the PFHd of a safety function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemSpec {
    pub id: String,
    pub architecture: Architecture,
    /// One device per channel for redundant architectures
    pub devices: Vec<DeviceSpec>,
}

impl SubsystemSpec {
    pub fn new(id: &str, architecture: Architecture) -> Self {
        Self {
            id: id.to_string(),
            architecture,
            devices: Vec::new(),
        }
    }

    pub fn with_device(mut self, device: DeviceSpec) -> Self {
        self.devices.push(device);
        self
    }
}

/// How a stage's channels are monitored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MonitoringMode {
    #[default]
    None,
    /// Periodic test by test equipment
    Periodic,
    /// Continuous cross-monitoring between channels
    CrossMonitoring,
}

impl MonitoringMode {
    pub fn is_monitored(&self) -> bool {
        !matches!(self, MonitoringMode::None)
    }
}

/// Per-stage options
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelOptions {
    #[serde(default)]
    pub monitoring: MonitoringMode,
    /// Demand rate (0.0-1.0); `None` means nominal demand
    #[serde(default)]
    pub demand_rate: Option<f64>,
}

/// A single channel: device ids in series
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub devices: Vec<String>,
}

impl Channel {
    pub fn of(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Parallel channels of one stage (input, logic or output)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub options: ChannelOptions,
}

impl Stage {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            options: ChannelOptions::default(),
        }
    }

    pub fn monitored(mut self, mode: MonitoringMode) -> Self {
        self.options.monitoring = mode;
        self
    }

    pub fn with_demand_rate(mut self, rate: f64) -> Self {
        self.options.demand_rate = Some(rate);
        self
    }

    pub fn channel_count(&self) -> u32 {
        self.channels.len() as u32
    }

    /// Longest series path among the channels
    pub fn series_length(&self) -> usize {
        self.channels
            .iter()
            .map(|c| c.devices.len())
            .max()
            .unwrap_or(0)
    }
}

/// Description of one machine safety function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyFunctionSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_pl: Option<PerformanceLevel>,
    #[serde(default)]
    pub target_sil: Option<Sil>,
    #[serde(default)]
    pub input: Stage,
    #[serde(default)]
    pub logic: Stage,
    #[serde(default)]
    pub output: Stage,
    #[serde(default)]
    pub subsystems: Vec<SubsystemSpec>,
    /// Test equipment parameters, if the function has a test channel
    #[serde(default)]
    pub test_equipment: Option<TestParameters>,
    /// CCF measures credited to the function
    #[serde(default)]
    pub ccf_measures: Vec<CcfMeasure>,
}

impl SafetyFunctionSpec {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            target_pl: None,
            target_sil: None,
            input: Stage::default(),
            logic: Stage::default(),
            output: Stage::default(),
            subsystems: Vec::new(),
            test_equipment: None,
            ccf_measures: Vec::new(),
        }
    }

    pub fn stages(&self) -> [(&'static str, &Stage); 3] {
        [
            ("input", &self.input),
            ("logic", &self.logic),
            ("output", &self.output),
        ]
    }

    /// Every device id referenced by the channels, in stage order
    pub fn referenced_devices(&self) -> Vec<&str> {
        self.stages()
            .iter()
            .flat_map(|(_, stage)| stage.channels.iter())
            .flat_map(|c| c.devices.iter().map(|d| d.as_str()))
            .collect()
    }
}
