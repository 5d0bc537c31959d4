//! Reduction of loop samples into per-operation statistics.

use std::collections::BTreeMap;

use crate::backend::BackendKind;
use crate::core::{EnvironmentInfo, Operation, RunConfig, RunReport, Sample, Stats, VerificationMismatch};
use crate::{BenchError, BenchResult};

/// Value at 1-based rank `ceil(p/100 * n)` of ascending `sorted`, 0 when empty.
pub fn percentile_nearest_rank(sorted: &[u64], p: u32) -> u64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let rank = (p as usize * n).div_ceil(100).clamp(1, n);
    sorted[rank - 1]
}

/// Stats over raw durations in nanoseconds.
pub fn stats_from_durations(durations: &[u64]) -> Stats {
    if durations.is_empty() {
        return Stats::default();
    }
    let mut sorted = durations.to_vec();
    sorted.sort_unstable();

    let count = sorted.len() as u64;
    let total_nanos: u128 = sorted.iter().map(|&d| u128::from(d)).sum();
    // Floor division; fits since the mean never exceeds the max
    let mean_nanos = (total_nanos / u128::from(count)) as u64;

    Stats {
        count,
        total_nanos,
        mean_nanos,
        p50_nanos: percentile_nearest_rank(&sorted, 50),
        p95_nanos: percentile_nearest_rank(&sorted, 95),
        p99_nanos: percentile_nearest_rank(&sorted, 99),
        min_nanos: sorted[0],
        max_nanos: sorted[sorted.len() - 1],
    }
}

/// Group `samples` by operation and compute stats for each of `operations`.
///
/// Operations with no samples get all-zero stats. Samples must be in
/// iteration order.
pub fn summarize_samples(
    samples: &[Sample],
    operations: &[Operation],
) -> BenchResult<BTreeMap<Operation, Stats>> {
    if let Some(w) = samples
        .windows(2)
        .find(|w| w[1].iteration_index < w[0].iteration_index)
    {
        return Err(BenchError::Message(format!(
            "samples out of iteration order: {} after {}",
            w[1].iteration_index, w[0].iteration_index
        )));
    }

    let mut groups: BTreeMap<Operation, Vec<u64>> =
        operations.iter().map(|&op| (op, Vec::new())).collect();
    for sample in samples {
        groups
            .entry(sample.operation)
            .or_default()
            .push(sample.duration_nanos);
    }
    Ok(groups
        .into_iter()
        .map(|(op, durations)| (op, stats_from_durations(&durations)))
        .collect())
}

/// Operations a run with `config` reports on.
pub fn reported_operations(config: &RunConfig) -> Vec<Operation> {
    Operation::ALL
        .into_iter()
        .filter(|op| config.time_issuance || *op != Operation::Issue)
        .collect()
}

/// Build the final report for a completed loop.
pub fn summarize(
    backend_kind: BackendKind,
    config: RunConfig,
    env: EnvironmentInfo,
    samples: Vec<Sample>,
    mismatches: Vec<VerificationMismatch>,
) -> BenchResult<RunReport> {
    let summary = summarize_samples(&samples, &reported_operations(&config))?;
    let mut report = RunReport::new(backend_kind, config, env);
    report.samples = samples;
    report.summary = summary;
    report.verification_mismatches = mismatches;
    Ok(report)
}
