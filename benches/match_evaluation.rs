//! Match Evaluation Benchmark (Criterion)
//!
//! Measures store matching as the number of declared policies grows, with
//! the matching policy placed last so every policy is scanned.

use abac_engine::{Attributes, Policy, PolicyStore, Request};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn definitions() -> Attributes {
    let mut definitions = Attributes::new();
    definitions.insert("tenant".to_string(), "acme".into());
    definitions.insert("region".to_string(), "eu-west-1".into());
    definitions
}

/// `count` policies of which only the last permits `UPDATE` for the owner.
fn sample_policies(count: usize) -> Vec<Policy> {
    (0..count)
        .map(|i| {
            if i + 1 == count {
                Policy::new(
                    format!("policy-{}", i),
                    r#"object.owner_id == subject.id && tenant == "acme""#,
                    ["GET", "UPDATE"],
                )
            } else {
                Policy::new(
                    format!("policy-{}", i),
                    format!(r#"subject.role == "role-{}""#, i),
                    ["GET", "UPDATE"],
                )
            }
        })
        .collect()
}

fn sample_request() -> Request {
    Request::builder()
        .action("UPDATE")
        .subject("id", "user-12345")
        .subject("role", "developer")
        .object("type", "account")
        .object("owner_id", "user-12345")
        .build()
}

fn benchmark_match(c: &mut Criterion) {
    let request = sample_request();
    let mut group = c.benchmark_group("match_evaluation");

    for policy_count in [1, 5, 10, 20, 50].iter() {
        let store = match PolicyStore::new(sample_policies(*policy_count), definitions()) {
            Ok(store) => store,
            Err(e) => panic!("benchmark store failed to build: {}", e),
        };

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("policies", policy_count),
            &store,
            |b, store| {
                b.iter(|| std::hint::black_box(store.evaluate(&request).ok()));
            },
        );
    }

    group.finish();
}

fn benchmark_action_filter(c: &mut Criterion) {
    let store = match PolicyStore::new(sample_policies(50), definitions()) {
        Ok(store) => store,
        Err(e) => panic!("benchmark store failed to build: {}", e),
    };
    let request = Request::builder()
        .action("DELETE")
        .subject("id", "user-12345")
        .object("owner_id", "user-12345")
        .build();

    c.bench_function("match_evaluation/no_action_match", |b| {
        b.iter(|| std::hint::black_box(store.evaluate(&request).ok()));
    });
}

criterion_group!(benches, benchmark_match, benchmark_action_filter);

criterion_main!(benches);
