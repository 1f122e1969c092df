use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use safeval_engine::batch::BatchEvaluator;
use safeval_engine::category::{CategoryAdvisor, CategorySignals};
use safeval_engine::ccf::{format_ccf_report, CcfScorer};
use safeval_engine::evaluator::format_evaluation_report;
use safeval_engine::{
    check_consistency, Category, ComplianceChecklist, ComplianceEvaluator, DcInput, DetailLevel,
    DeviceDc, DiagnosticCoverageCalculator, EngineConfig, FunctionRepository, PerformanceLevel,
    PfhdAggregator, ProjectStore, SafetyFunctionEvaluator, Sil, SubsystemSpec, TestParameters,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// safeval - Performance Level / SIL evaluation for machine safety functions
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a compliance checklist
    Evaluate {
        /// Checklist file (JSON)
        checklist: PathBuf,
    },

    /// Evaluate a safety function from a project file
    Function {
        /// Project file (JSON) with devices and functions
        project: PathBuf,

        /// Safety function id
        id: String,

        /// Include the DCavg step trace
        #[arg(long)]
        detailed: bool,
    },

    /// Compute DCavg for devices in series
    Dc {
        /// Device DC values (0.0-1.0), in series order
        #[arg(long = "dc", required = true)]
        values: Vec<f64>,

        /// Demand rate (0.0-1.0)
        #[arg(short, long, default_value_t = 1.0)]
        demand_rate: f64,

        /// Series device count for the masking limit (defaults to the number of values)
        #[arg(short, long)]
        series: Option<usize>,

        /// Test equipment frequency
        #[arg(long, requires = "test_coverage")]
        test_frequency: Option<f64>,

        /// Test equipment coverage (0.0-1.0)
        #[arg(long, requires = "test_frequency")]
        test_coverage: Option<f64>,

        /// Include the step trace
        #[arg(long)]
        detailed: bool,
    },

    /// Aggregate PFHd over subsystems
    Pfhd {
        /// Subsystem list (JSON)
        subsystems: PathBuf,
    },

    /// Score CCF measures
    Ccf {
        /// Measure codes (SEP, DIV, WIR, EMC, MNT, LOG, QAP, DOC)
        codes: Vec<String>,

        /// Evaluate an externally determined score instead of codes
        #[arg(short, long)]
        score: Option<u32>,
    },

    /// Suggest architecture categories
    Category {
        #[arg(long, default_value_t = 1)]
        input: u32,
        #[arg(long, default_value_t = 1)]
        logic: u32,
        #[arg(long, default_value_t = 1)]
        output: u32,

        /// Stages with monitoring (input, logic, output)
        #[arg(long, value_delimiter = ',')]
        monitored: Vec<String>,

        /// Test equipment present
        #[arg(long)]
        test_equipment: bool,

        #[arg(long, default_value_t = 0)]
        ccf_score: u32,

        /// Category claimed by the design (B, 1-4)
        #[arg(long)]
        declared: Option<Category>,
    },

    /// Cross-check a PL against a SIL
    Consistency {
        #[arg(long)]
        pl: Option<PerformanceLevel>,
        #[arg(long)]
        sil: Option<Sil>,
    },

    /// Evaluate many checklists or functions in parallel
    Batch {
        /// Checklist map (JSON object keyed by id), or a project with --functions
        input: PathBuf,

        /// Treat the input as a project and evaluate every function
        #[arg(long)]
        functions: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Evaluate { checklist } => {
            let checklist: ComplianceChecklist = read_json(&checklist)?;
            let result = ComplianceEvaluator::with_config(config).evaluate(&checklist);
            if cli.json {
                print_json(&result)?;
            } else {
                print!("{}", format_evaluation_report(&result));
            }
        }
        Commands::Function {
            project,
            id,
            detailed,
        } => {
            let store: ProjectStore = read_json(&project)?;
            let detail = if detailed {
                DetailLevel::Detailed
            } else {
                DetailLevel::Summary
            };
            let evaluation = SafetyFunctionEvaluator::with_config(config.clone())
                .with_detail(detail)
                .evaluate_by_id(&store, &store, &id)
                .with_context(|| format!("Failed to evaluate safety function '{}'", id))?;
            if cli.json {
                print_json(&evaluation)?;
            } else {
                let result = ComplianceEvaluator::with_config(config).function_result(&evaluation);
                print!("{}", format_evaluation_report(&result));
                for step in &evaluation.diagnostic_coverage.steps {
                    println!("  {:<28} {:.6}  {}", step.name, step.value, step.note);
                }
            }
        }
        Commands::Dc {
            values,
            demand_rate,
            series,
            test_frequency,
            test_coverage,
            detailed,
        } => {
            let devices = values
                .iter()
                .enumerate()
                .map(|(i, dc)| DeviceDc::new(&format!("device-{}", i + 1), *dc))
                .collect();
            let mut input = DcInput::series(devices, demand_rate);
            if let Some(n) = series {
                input = input.with_series_count(n);
            }
            if let (Some(frequency), Some(coverage)) = (test_frequency, test_coverage) {
                input = input.with_test(TestParameters {
                    frequency,
                    coverage,
                });
            }
            let mut calculator =
                DiagnosticCoverageCalculator::with_config(config.masking, config.test_channel);
            if detailed {
                calculator = calculator.detailed();
            }
            let result = calculator.calculate(&input);
            if cli.json {
                print_json(&result)?;
            } else {
                println!("DCavg:         {:.4} ({})", result.dc_avg, result.band);
                println!("Raw DCavg:     {:.6}", result.raw_dc_avg);
                println!("Masking limit: {:.4}", result.masking_limit);
                println!("Test DC:       {:.4}", result.dc_test);
                for step in &result.steps {
                    println!("  {:<28} {:.6}  {}", step.name, step.value, step.note);
                }
                for recommendation in &result.recommendations {
                    println!("  - {}", recommendation);
                }
                print_warnings(&result.warnings);
            }
        }
        Commands::Pfhd { subsystems } => {
            let subsystems: Vec<SubsystemSpec> = read_json(&subsystems)?;
            let result = PfhdAggregator::with_config(config.pfhd).aggregate(&subsystems);
            if cli.json {
                print_json(&result)?;
            } else {
                for sub in &result.subsystems {
                    println!(
                        "{:<20} {:<6} PFHd {:.3e} (β {:.3}){}",
                        sub.subsystem_id,
                        sub.architecture,
                        sub.pfhd,
                        sub.beta,
                        if sub.fallback { " [series fallback]" } else { "" }
                    );
                }
                println!("Total PFHd: {:.3e}", result.total_pfhd);
                println!(
                    "Achieved SIL: {}",
                    result
                        .achieved_sil
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                print_warnings(&result.warnings);
            }
        }
        Commands::Ccf { codes, score } => {
            let scorer = CcfScorer::new();
            let assessment = match score {
                Some(score) => {
                    let selected = codes
                        .iter()
                        .filter_map(|c| safeval_engine::CcfMeasure::from_code(c))
                        .collect::<Vec<_>>();
                    scorer.assess_score(score, &selected)
                }
                None => scorer.assess_codes(&codes),
            };
            if cli.json {
                print_json(&assessment)?;
            } else {
                print!("{}", format_ccf_report(&assessment));
                print_warnings(&assessment.warnings);
            }
        }
        Commands::Category {
            input,
            logic,
            output,
            monitored,
            test_equipment,
            ccf_score,
            declared,
        } => {
            let is_monitored = |stage: &str| monitored.iter().any(|m| m.eq_ignore_ascii_case(stage));
            let signals = CategorySignals {
                input_channels: input,
                logic_channels: logic,
                output_channels: output,
                input_monitored: is_monitored("input"),
                logic_monitored: is_monitored("logic"),
                output_monitored: is_monitored("output"),
                has_test_equipment: test_equipment,
                ccf_score,
            };
            let advice = CategoryAdvisor::with_weights(config.category).advise(&signals, declared);
            if cli.json {
                print_json(&advice)?;
            } else {
                for suggestion in &advice.suggestions {
                    println!(
                        "{:<6} {:.2}  {}",
                        suggestion.category.to_string(),
                        suggestion.confidence,
                        suggestion.justification
                    );
                    for precondition in &suggestion.preconditions {
                        println!("         requires: {}", precondition);
                    }
                }
                for conflict in &advice.conflicts {
                    println!(
                        "conflict[{:?}] {}\n  fix: {}",
                        conflict.severity, conflict.message, conflict.remediation
                    );
                }
            }
        }
        Commands::Consistency { pl, sil } => {
            let result = check_consistency(pl, sil);
            if cli.json {
                print_json(&result)?;
            } else {
                println!(
                    "{}",
                    if result.is_consistent {
                        "✅ Consistent"
                    } else {
                        "❌ Inconsistent"
                    }
                );
                for action in &result.recommended_actions {
                    println!("  - {}", action);
                }
                print_warnings(&result.warnings);
            }
        }
        Commands::Batch { input, functions } => {
            let batch = BatchEvaluator::new(ComplianceEvaluator::with_config(config));
            let report = if functions {
                let store: ProjectStore = read_json(&input)?;
                let ids = store.function_ids();
                batch.evaluate_functions(&store, &store, &ids)
            } else {
                let checklists: indexmap::IndexMap<String, ComplianceChecklist> =
                    read_json(&input)?;
                batch.evaluate_checklists(&checklists)
            };
            if cli.json {
                print_json(&report)?;
            } else {
                for item in &report.items {
                    match item.result() {
                        Some(result) => println!("{:<24} {}", item.id, result.summary),
                        None => println!("{:<24} ❌ failed", item.id),
                    }
                }
                println!(
                    "\n{} evaluated, {} compliant, {} failed",
                    report.succeeded(),
                    report.compliant(),
                    report.failed()
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading engine configuration from {:?}", path);
            EngineConfig::from_path(path)
                .with_context(|| format!("Failed to load configuration {:?}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_warnings(warnings: &[safeval_engine::Warning]) {
    for warning in warnings {
        eprintln!("{}", warning);
    }
}
