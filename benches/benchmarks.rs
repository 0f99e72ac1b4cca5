//! Benchmark suite for OxiProof.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use oxiproof::categorizer::majority_vote;
use oxiproof::config::VerifierConfig;
use oxiproof::engine::ProofVerifier;
use oxiproof::error::OracleError;
use oxiproof::oracle::FnOracle;
use oxiproof::parser::{extract_delimited, last_json_object};
use oxiproof::session::VerificationSession;
use oxiproof::types::Category;
use oxiproof::verifier::{parse_audit, parse_justification};

// ============================================================================
// Response Parsing Benchmarks
// ============================================================================

fn justification_reply(rules: usize) -> String {
    let body = (1..=rules)
        .map(|i| {
            format!(
                "\"rule {i}\": \"Rule number {i}.\", \"sentence numbers {i}\": [1, 2], \
                 \"conclusion numbers {i}\": [], \"conclusion {i}\": \"Conclusion {i}.\""
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("Some reasoning first.\n```json\n{{{body}}}\n```\nDone.")
}

fn audit_reply(verdicts: usize) -> String {
    let body = (1..=verdicts)
        .map(|i| format!("\"verdict {i}\": true"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Checking each rule.\n```json{{{body}, \"relation\": \"restate\"}}```")
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for rules in [1, 4, 16] {
        let justification = justification_reply(rules);
        let audit = audit_reply(rules);

        group.throughput(Throughput::Bytes(justification.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("last_json_object", rules),
            &justification,
            |bench, text| {
                bench.iter(|| last_json_object(black_box(text)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("parse_justification", rules),
            &justification,
            |bench, text| {
                bench.iter(|| parse_justification(black_box(text)));
            },
        );

        group.bench_with_input(BenchmarkId::new("parse_audit", rules), &audit, |bench, text| {
            bench.iter(|| parse_audit(black_box(text)));
        });
    }

    let segmented = format!(
        "Here you go:\n```\n{}\n```",
        (1..=50)
            .map(|i| format!("Sentence number {i}."))
            .collect::<Vec<_>>()
            .join("\n")
    );
    group.bench_function("extract_delimited", |bench| {
        bench.iter(|| extract_delimited(black_box(&segmented)));
    });

    group.finish();
}

fn bench_majority_vote(c: &mut Criterion) {
    let mut group = c.benchmark_group("majority_vote");

    for sentences in [10, 100] {
        let samples: Vec<Vec<Category>> = (0..7)
            .map(|s| {
                (0..sentences)
                    .map(|i| {
                        if (i + s) % 3 == 0 {
                            Category::Other
                        } else {
                            Category::Derivation
                        }
                    })
                    .collect()
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(sentences),
            &samples,
            |bench, samples| {
                bench.iter(|| majority_vote(black_box(samples)));
            },
        );
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn instant_reply(prompt: &str) -> Result<String, OracleError> {
    if prompt.contains("Check applications") {
        Ok("```json{\"verdict 1\": true, \"relation\": \"restate\"}```".to_string())
    } else {
        Ok(justification_reply(1))
    }
}

fn bench_locate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("locate");

    for steps in [1, 10, 50] {
        group.throughput(Throughput::Elements(steps as u64));

        group.bench_with_input(BenchmarkId::new("mock_oracle", steps), &steps, |bench, &steps| {
            let verifier = ProofVerifier::new(FnOracle::new(instant_reply), VerifierConfig::default());
            bench.to_async(&rt).iter_batched(
                || {
                    VerificationSession::from_sentences(
                        vec!["Let x = 1.".to_string()],
                        (0..steps).map(|i| format!("So x + {i} = {}.", i + 1)).collect(),
                    )
                },
                |mut session| {
                    let verifier = &verifier;
                    async move { black_box(verifier.locate(&mut session).await) }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_majority_vote, bench_locate);
criterion_main!(benches);
