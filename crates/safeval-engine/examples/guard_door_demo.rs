//! Guard door interlock evaluation demo
//!
//! Builds a dual-channel safety function in memory and prints the verdict.

use safeval_engine::ccf::CcfMeasure;
use safeval_engine::evaluator::format_evaluation_report;
use safeval_engine::model::{Channel, MonitoringMode, Stage};
use safeval_engine::pfhd::Architecture;
use safeval_engine::{
    ComplianceEvaluator, DeviceSpec, PerformanceLevel, ProjectStore, SafetyFunctionSpec, Sil,
    SubsystemSpec,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== safeval guard door demo ===\n");

    let mut store = ProjectStore::new();
    for (id, years, dc, pfhd) in [
        ("door-sw-a", 200.0, 0.99, 2e-9),
        ("door-sw-b", 200.0, 0.99, 2e-9),
        ("plc-a", 120.0, 0.99, 1e-8),
        ("plc-b", 120.0, 0.99, 1e-8),
        ("contactor-a", 80.0, 0.99, 5e-9),
        ("contactor-b", 80.0, 0.99, 5e-9),
    ] {
        store.add_device(
            DeviceSpec::new(id)
                .with_mttfd_years(years)
                .with_dc(dc)
                .with_pfhd(pfhd)
                .with_beta(0.02),
        );
    }

    let mut function = SafetyFunctionSpec::new("SF-01", "Guard door interlock");
    function.target_pl = Some(PerformanceLevel::D);
    function.target_sil = Some(Sil::Sil2);
    function.input = Stage::new(vec![Channel::of(&["door-sw-a"]), Channel::of(&["door-sw-b"])])
        .monitored(MonitoringMode::CrossMonitoring);
    function.logic = Stage::new(vec![Channel::of(&["plc-a"]), Channel::of(&["plc-b"])])
        .monitored(MonitoringMode::CrossMonitoring);
    function.output = Stage::new(vec![
        Channel::of(&["contactor-a"]),
        Channel::of(&["contactor-b"]),
    ])
    .monitored(MonitoringMode::CrossMonitoring);
    function.ccf_measures = vec![
        CcfMeasure::Separation,
        CcfMeasure::Diversity,
        CcfMeasure::Emc,
        CcfMeasure::MaintenanceTesting,
    ];
    function.subsystems = ["door-sw", "plc", "contactor"]
        .iter()
        .map(|name| {
            let a = store.devices[&format!("{}-a", name)].clone();
            let b = store.devices[&format!("{}-b", name)].clone();
            SubsystemSpec::new(name, Architecture::OneOoTwo)
                .with_device(a)
                .with_device(b)
        })
        .collect();
    store.add_function(function);

    let result = ComplianceEvaluator::new().evaluate_function(&store, &store, "SF-01")?;
    print!("{}", format_evaluation_report(&result));

    Ok(())
}
