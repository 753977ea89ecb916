#[macro_use]
extern crate criterion;

use std::sync::Arc;

use amdsim_config::{EngineType, ProtocolSpecification, RunParameters};
use amdsim_engine::{build_engine, AuditLog};
use amdsim_simulator::ClinicalModel;
use chrono::NaiveDate;
use criterion::{black_box, BenchmarkId, Criterion};

const PROTOCOL: &str = include_str!("../../protocols/treat_and_extend.yaml");

fn benchmark_engines(c: &mut Criterion) {
    let spec = ProtocolSpecification::load_str(PROTOCOL, None).unwrap();
    let model = Arc::new(ClinicalModel::from_spec(&spec).unwrap());
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut group = c.benchmark_group("engines");
    for engine in [EngineType::Abs, EngineType::Des] {
        for patients in [100i64, 1_000] {
            let params = RunParameters::new(engine, patients, 5.0, 42, start).unwrap();
            group.bench_with_input(
                BenchmarkId::new(engine.as_str(), patients),
                &params,
                |b, params| {
                    b.iter(|| {
                        let mut audit = AuditLog::new();
                        let mut engine = build_engine(model.clone(), *params);
                        black_box(engine.run(&mut audit).unwrap())
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_engines);
criterion_main!(benches);
