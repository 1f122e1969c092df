#[cfg(test)]
mod function_evaluation_tests {
    use safeval_engine::batch::BatchEvaluator;
    use safeval_engine::levels::{Category, PerformanceLevel, Sil};
    use safeval_engine::{
        ComplianceEvaluator, EngineConfig, EngineError, FunctionRepository, ProjectStore,
        SafetyFunctionEvaluator,
    };
    use std::io::Write;

    const PROJECT: &str = r#"{
        "devices": {
            "es-1":  { "id": "es-1",  "mttfd_hours": 876000.0, "dc_avg": 0.9, "pfhd": 2e-8 },
            "plc-1": { "id": "plc-1", "mttfd_hours": 876000.0, "dc_avg": 0.9, "pfhd": 5e-7 },
            "k-1":   { "id": "k-1",   "mttfd_hours": 438000.0, "dc_avg": 0.6, "pfhd": 1e-8 }
        },
        "functions": {
            "sf-stop": {
                "id": "sf-stop",
                "name": "Emergency stop",
                "target_pl": "C",
                "target_sil": "Sil1",
                "input":  { "channels": [ { "devices": ["es-1"] } ] },
                "logic":  { "channels": [ { "devices": ["plc-1"] } ],
                            "options": { "monitoring": "Periodic" } },
                "output": { "channels": [ { "devices": ["k-1"] } ] },
                "subsystems": [
                    { "id": "logic", "architecture": "1oo1",
                      "devices": [ { "id": "plc-1", "mttfd_hours": 876000.0,
                                     "dc_avg": 0.9, "pfhd": 5e-7 } ] }
                ],
                "test_equipment": { "frequency": 100.0, "coverage": 0.9 },
                "ccf_measures": ["Emc", "Diversity", "Separation", "Documentation"]
            },
            "sf-broken": {
                "id": "sf-broken",
                "name": "Guard interlock",
                "output": { "channels": [ { "devices": ["k-404"] } ] }
            }
        }
    }"#;

    fn project() -> ProjectStore {
        serde_json::from_str(PROJECT).expect("project fixture parses")
    }

    #[test]
    fn test_single_channel_with_test_equipment() {
        let store = project();
        let evaluation = SafetyFunctionEvaluator::new()
            .evaluate_by_id(&store, &store, "sf-stop")
            .unwrap();

        println!(
            "DCavg {:.4}, MTTFd {:.1} y, {:?}",
            evaluation.diagnostic_coverage.dc_avg,
            evaluation.channel_mttfd_years,
            evaluation.performance_level.achieved
        );

        assert_eq!(evaluation.ccf.score, 65);
        assert_eq!(evaluation.category.highest_category(), Category::Two);
        assert!(evaluation.diagnostic_coverage.capped);
        assert!((evaluation.diagnostic_coverage.dc_avg - 0.97).abs() < 1e-9);
        assert!((evaluation.channel_mttfd_years - 25.0).abs() < 1e-6);
        assert_eq!(evaluation.performance_level.achieved, Some(PerformanceLevel::C));
        assert_eq!(evaluation.pfhd.achieved_sil, Some(Sil::Sil2));
        assert!(evaluation.consistency.is_consistent);
        assert!(evaluation.meets_targets());

        let result = ComplianceEvaluator::new().function_result(&evaluation);
        assert!(result.is_compliant, "{:?}", result.non_conformities);
    }

    #[test]
    fn test_unknown_references() {
        let store = project();
        let evaluator = SafetyFunctionEvaluator::new();

        let err = evaluator
            .evaluate_by_id(&store, &store, "sf-broken")
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { ref id, .. } if id == "k-404"));

        let err = evaluator
            .evaluate_by_id(&store, &store, "sf-none")
            .unwrap_err();
        assert_eq!(err.to_string(), "Safety function 'sf-none' not found");
    }

    #[test]
    fn test_function_batch() {
        let store = project();
        let ids = store.function_ids();
        let report = BatchEvaluator::default().evaluate_functions(&store, &store, &ids);

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].id, "sf-stop");
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.compliant(), 1);
    }

    #[test]
    fn test_config_changes_masking_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[masking]\nper_device_penalty = 0.0").unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.masking.per_device_penalty, 0.0);
        assert_eq!(config.masking.base_limit, 0.99);

        let store = project();
        let evaluation = SafetyFunctionEvaluator::with_config(config)
            .evaluate_by_id(&store, &store, "sf-stop")
            .unwrap();
        assert!((evaluation.diagnostic_coverage.masking_limit - 0.99).abs() < 1e-12);
        assert!((evaluation.diagnostic_coverage.dc_avg - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[masking]\nfloor = 0.995").unwrap();
        assert!(EngineConfig::from_path(file.path()).is_err());
    }
}
