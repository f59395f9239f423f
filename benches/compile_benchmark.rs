//! Parse and compile benchmarks for program indicator expressions

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use indicator_expression::model::{
    Constant, DataElement, InMemoryMetadata, InMemoryValues, ProgramStage,
    TrackedEntityAttribute,
};
use indicator_expression::{
    AnalyticsType, InMemoryProgramIndicatorStore, ProgramIndicator, ProgramIndicatorEngine,
    ResultType, ValueType, parse,
};
use std::hint::black_box;
use std::sync::Arc;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("item_arithmetic", "#{ps1.de1} * 2 + C{c1}"),
    ("count", "d2:countIfCondition(#{ps1.de1}, '> 5') / V{event_count}"),
    (
        "date_difference",
        "d2:daysBetween(V{enrollment_date}, PS_EVENTDATE:ps1)",
    ),
    (
        "conditional",
        "d2:condition('#{ps1.de1} > 5 and A{at1} == \\'F\\'', d2:zing(#{ps1.de1}), 0) + V{value_count}",
    ),
];

fn engine() -> ProgramIndicatorEngine {
    let metadata = InMemoryMetadata::new()
        .with_program_stage(ProgramStage {
            uid: "ps1".to_string(),
            name: "Birth".to_string(),
            program_uid: Some("prog".to_string()),
        })
        .with_data_element(DataElement {
            uid: "de1".to_string(),
            name: "Weight".to_string(),
            value_type: ValueType::Number,
        })
        .with_attribute(TrackedEntityAttribute {
            uid: "at1".to_string(),
            name: "Gender".to_string(),
            value_type: ValueType::Text,
        })
        .with_constant(Constant {
            uid: "c1".to_string(),
            name: "Ten".to_string(),
            value: 10.0,
        });
    ProgramIndicatorEngine::new(
        Arc::new(metadata),
        Arc::new(InMemoryProgramIndicatorStore::new()),
    )
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, expression) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), expression, |b, expr| {
            b.iter(|| black_box(parse(black_box(expr))))
        });
    }
    group.finish();
}

fn benchmark_describe(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("describe");
    for (name, expression) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), expression, |b, expr| {
            b.iter(|| black_box(engine.untyped_description(black_box(expr))))
        });
    }
    group.finish();
}

fn benchmark_sql(c: &mut Criterion) {
    let engine = engine();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let mut group = c.benchmark_group("analytics_sql");
    for analytics_type in [AnalyticsType::Event, AnalyticsType::Enrollment] {
        let indicator = ProgramIndicator::new("pi", "Indicator", "prog", "1")
            .with_analytics_type(analytics_type);
        for (name, expression) in EXPRESSIONS {
            group.bench_with_input(
                BenchmarkId::new(format!("{analytics_type:?}"), name),
                expression,
                |b, expr| {
                    b.iter(|| {
                        black_box(engine.analytics_sql(black_box(expr), &indicator, start, end))
                    })
                },
            );
        }
    }
    group.finish();
}

fn benchmark_evaluate(c: &mut Criterion) {
    let engine = engine();
    let values = InMemoryValues::new()
        .with_stage_value("ps1", "de1", 3.0)
        .with_stage_value("ps1", "de1", 7.0)
        .with_attribute("at1", "F");

    c.bench_function("evaluate_count", |b| {
        b.iter(|| {
            black_box(engine.evaluate(
                black_box("d2:countIfCondition(#{ps1.de1}, '> 5') * C{c1}"),
                &values,
                Some(ResultType::Double),
                None,
            ))
        })
    });
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_describe,
    benchmark_sql,
    benchmark_evaluate
);
criterion_main!(benches);
