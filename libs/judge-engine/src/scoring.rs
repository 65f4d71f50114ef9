/// Score Aggregator - Weighted Pass/Fail Scoring
///
/// **Scoring Rules:**
/// - Each test case has a non-negative weight (negative or non-finite counts as 0)
/// - earned = sum of weights of passed results matching a known test case,
///   each test case credited at most once
/// - score = round(100 * earned / sum of all test case weights)
/// - Unknown result ids are ignored
/// - No test cases, or zero total weight, scores 0

use judge_common::types::{TestCase, TestCaseResult};
use std::collections::{HashMap, HashSet};

fn effective_weight(test_case: &TestCase) -> f64 {
    if test_case.weight.is_finite() && test_case.weight > 0.0 {
        test_case.weight
    } else {
        0.0
    }
}

/// Weighted score in 0..=100
pub fn score(results: &[TestCaseResult], test_cases: &[TestCase]) -> u32 {
    let total: f64 = test_cases.iter().map(effective_weight).sum();
    if total <= 0.0 {
        return 0;
    }

    let weights: HashMap<&str, f64> = test_cases
        .iter()
        .map(|tc| (tc.id.as_str(), effective_weight(tc)))
        .collect();

    let mut credited: HashSet<&str> = HashSet::new();
    let earned: f64 = results
        .iter()
        .filter(|r| r.passed)
        .filter_map(|r| {
            let weight = weights.get(r.test_case_id.as_str())?;
            credited.insert(r.test_case_id.as_str()).then_some(*weight)
        })
        .sum();

    (earned / total * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Number of passed results
pub fn total_passed(results: &[TestCaseResult]) -> usize {
    results.iter().filter(|r| r.passed).count()
}
