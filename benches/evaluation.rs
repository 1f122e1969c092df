//! Evaluation throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use indexmap::IndexMap;
use safeval_engine::batch::BatchEvaluator;
use safeval_engine::diagnostic_coverage::{DcInput, DeviceDc, DiagnosticCoverageCalculator};
use safeval_engine::evaluator::ComplianceChecklist;
use safeval_engine::levels::Category;
use safeval_engine::model::{DeviceSpec, SubsystemSpec, HOURS_PER_YEAR};
use safeval_engine::performance_level::Iso13849Parameters;
use safeval_engine::pfhd::{Architecture, PfhdAggregator};
use safeval_engine::risk::{Rating, RiskInput};
use safeval_engine::ComplianceEvaluator;

fn checklist(i: usize) -> ComplianceChecklist {
    ComplianceChecklist {
        risk: RiskInput::new(Rating::ALL[i % 3], Rating::ALL[(i / 3) % 3], Rating::Low)
            .with_mitigation("Interlocked guard"),
        iso13849: Iso13849Parameters {
            required_pl: None,
            category: Category::Three,
            dc_avg: 0.9 + (i % 10) as f64 * 0.01,
            mttfd_hours: (20 + i % 60) as f64 * HOURS_PER_YEAR,
            ccf_score: 65 + (i % 30) as u32,
            validation_performed: true,
        },
        items: Vec::new(),
        achieved_sil: None,
    }
}

fn benchmark_dc(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagnostic_coverage");
    let calculator = DiagnosticCoverageCalculator::new();
    let detailed = DiagnosticCoverageCalculator::new().detailed();

    for n in [2usize, 8, 32] {
        let devices: Vec<DeviceDc> = (0..n)
            .map(|i| DeviceDc::new(&format!("d{}", i), 0.9 + (i % 9) as f64 * 0.01))
            .collect();
        let input = DcInput::series(devices, 0.5);

        group.bench_with_input(BenchmarkId::new("summary", n), &input, |b, input| {
            b.iter(|| black_box(calculator.calculate(input)))
        });
        group.bench_with_input(BenchmarkId::new("detailed", n), &input, |b, input| {
            b.iter(|| black_box(detailed.calculate(input)))
        });
    }

    group.finish();
}

fn benchmark_pfhd(c: &mut Criterion) {
    let aggregator = PfhdAggregator::new();
    let subsystems: Vec<SubsystemSpec> = (0..16)
        .map(|i| {
            let architecture = Architecture::ALL[i % Architecture::ALL.len()];
            let channels = architecture.profile().channels.unwrap_or(2);
            (0..channels).fold(
                SubsystemSpec::new(&format!("s{}", i), architecture),
                |sub, ch| {
                    sub.with_device(
                        DeviceSpec::new(&format!("s{}-{}", i, ch))
                            .with_pfhd(1e-8 * (ch + 1) as f64)
                            .with_beta(0.05)
                            .with_dc(0.9),
                    )
                },
            )
        })
        .collect();

    c.bench_function("pfhd_aggregate_16", |b| {
        b.iter(|| black_box(aggregator.aggregate(&subsystems)))
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("checklist_batch");

    for size in [100usize, 1000] {
        let checklists: IndexMap<String, ComplianceChecklist> =
            (0..size).map(|i| (format!("c{}", i), checklist(i))).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &checklists, |b, list| {
            let evaluator = ComplianceEvaluator::new();
            b.iter(|| {
                for checklist in list.values() {
                    black_box(evaluator.evaluate(checklist));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &checklists, |b, list| {
            let batch = BatchEvaluator::default();
            b.iter(|| black_box(batch.evaluate_checklists(list)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_dc, benchmark_pfhd, benchmark_batch);
criterion_main!(benches);
