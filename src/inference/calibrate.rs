//! Turn raw model output into ranked, thresholded class decisions.

use serde::Serialize;

/// What the model's output row contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Unnormalized scores; softmax is applied.
    Logits,
    /// Already a probability distribution; used as-is.
    Probabilities,
}

/// How many classes a pipeline reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The `k` highest-scoring classes.
    TopK(usize),
    /// Only the best class, or nothing if it misses its threshold.
    SingleWithReject,
}

/// One selected class with its threshold decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredClass {
    /// Model output index.
    pub id: usize,
    /// Calibrated probability.
    pub confidence: f32,
    /// Minimum confidence for this class.
    pub threshold: f32,
    /// `confidence >= threshold`.
    pub is_confident: bool,
}

impl ScoredClass {
    fn new(id: usize, confidence: f32, threshold: f32) -> Self {
        Self {
            id,
            confidence,
            threshold,
            is_confident: confidence >= threshold,
        }
    }
}

/// Outcome of calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Classes to report, best first.
    Selected(Vec<ScoredClass>),
    /// The best class missed its threshold.
    Rejected {
        /// The class that was rejected.
        best: ScoredClass,
    },
}

/// Numerically stable softmax.
///
/// `+inf` logits (FP16 overflow) share all of the mass equally.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if is_pos_inf(max) {
        let saturated = logits.iter().filter(|&&x| is_pos_inf(x)).count();
        #[allow(clippy::cast_precision_loss)]
        let share = 1.0 / saturated as f32;
        return logits
            .iter()
            .map(|&x| if is_pos_inf(x) { share } else { 0.0 })
            .collect();
    }

    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

fn is_pos_inf(x: f32) -> bool {
    x.is_infinite() && x.is_sign_positive()
}

/// Convert a raw output row to probabilities.
pub fn to_probabilities(raw: Vec<f32>, kind: OutputKind) -> Vec<f32> {
    match kind {
        OutputKind::Logits => softmax(&raw),
        OutputKind::Probabilities => raw,
    }
}

/// Order `(id, score)` pairs by descending score.
///
/// Equal scores keep ascending id order. NaN sorts last.
pub fn rank(scores: &[f32]) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| sort_key(b.1).total_cmp(&sort_key(a.1)));
    ranked
}

fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Apply `cardinality` and per-class thresholds to a probability row.
pub fn select(
    probabilities: &[f32],
    cardinality: Cardinality,
    threshold_for: impl Fn(usize) -> f32,
) -> Decision {
    let ranked = rank(probabilities);

    match cardinality {
        Cardinality::TopK(k) => Decision::Selected(
            ranked
                .into_iter()
                .take(k)
                .map(|(id, conf)| ScoredClass::new(id, conf, threshold_for(id)))
                .collect(),
        ),
        Cardinality::SingleWithReject => match ranked.first() {
            Some(&(id, conf)) => {
                let best = ScoredClass::new(id, conf, threshold_for(id));
                if best.is_confident {
                    Decision::Selected(vec![best])
                } else {
                    Decision::Rejected { best }
                }
            }
            None => Decision::Selected(Vec::new()),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1, -3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_shift_invariant() {
        let a = softmax(&[2.0, 0.0, -1.0]);
        let b = softmax(&[1002.0, 1000.0, 999.0]);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_softmax_two_classes() {
        let probs = softmax(&[2.0, 0.0]);
        assert!((probs[0] - 0.880_797).abs() < 1e-4);
        assert!((probs[1] - 0.119_203).abs() < 1e-4);
    }

    #[test]
    fn test_softmax_positive_infinity() {
        let probs = softmax(&[f32::INFINITY, 0.0, 1.0]);
        assert_eq!(probs, vec![1.0, 0.0, 0.0]);

        let probs = softmax(&[0.5, f32::INFINITY, f32::INFINITY]);
        assert_eq!(probs, vec![0.0, 0.5, 0.5]);

        let decision = select(&softmax(&[f32::INFINITY, 0.0, 1.0]), Cardinality::TopK(1), |_| 0.5);
        let Decision::Selected(classes) = decision else {
            panic!("top-k never rejects");
        };
        assert_eq!(classes[0].id, 0);
        assert!(classes[0].is_confident);
    }

    #[test]
    fn test_rank_ties_prefer_lower_id() {
        let ranked = rank(&[0.2, 0.4, 0.4, 0.0]);
        let ids: Vec<usize> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_rank_nan_last() {
        let ranked = rank(&[f32::NAN, 0.1, 0.9]);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 0);
    }

    #[test]
    fn test_top_k_clamps_to_class_count() {
        let decision = select(&[0.7, 0.3], Cardinality::TopK(5), |_| 0.5);
        let Decision::Selected(classes) = decision else {
            panic!("top-k never rejects");
        };
        assert_eq!(classes.len(), 2);
        assert!(classes[0].is_confident);
        assert!(!classes[1].is_confident);
    }

    #[test]
    fn test_confidence_equal_to_threshold_is_confident() {
        let decision = select(&[0.5, 0.5], Cardinality::TopK(1), |_| 0.5);
        let Decision::Selected(classes) = decision else {
            panic!("top-k never rejects");
        };
        assert_eq!(classes[0].id, 0);
        assert!(classes[0].is_confident);
    }

    #[test]
    fn test_single_with_reject() {
        let decision = select(&[0.35, 0.33, 0.32], Cardinality::SingleWithReject, |_| 0.4);
        assert!(matches!(decision, Decision::Rejected { best } if best.id == 0));

        let decision = select(&[0.1, 0.8, 0.1], Cardinality::SingleWithReject, |_| 0.4);
        let Decision::Selected(classes) = decision else {
            panic!("expected a selection");
        };
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].id, 1);
    }

    #[test]
    fn test_probabilities_pass_through() {
        let raw = vec![0.1, 0.2, 0.7];
        assert_eq!(to_probabilities(raw.clone(), OutputKind::Probabilities), raw);
    }
}
