//! Pairing model outputs with labels and ranking them

use crate::labels::ClassLabels;
use crate::types::prediction::Prediction;
use std::cmp::Ordering;

/// Highest `k` outputs, descending by probability.
///
/// Ties keep ascending output index; NaN values rank below every number.
pub fn rank_top_k(probabilities: &[f32], labels: &ClassLabels, k: usize) -> Vec<Prediction> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| compare_desc(a.1, b.1).then(a.0.cmp(&b.0)));

    indexed
        .into_iter()
        .take(k)
        .map(|(index, probability)| {
            Prediction::new(index, labels.name_or_placeholder(index), probability)
        })
        .collect()
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Highest output value, if any
pub fn top1_probability(probabilities: &[f32]) -> Option<f32> {
    probabilities
        .iter()
        .copied()
        .filter(|p| !p.is_nan())
        .fold(None, |best, p| match best {
            Some(b) if b >= p => Some(b),
            _ => Some(p),
        })
}
