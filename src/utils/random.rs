//! # Random Selection
//!
//! Cumulative-weight draws used by the encounter roulette.

use rand::Rng;

/// Picks an index with probability proportional to its weight.
///
/// Draws uniformly in `[0, total)` and walks the weights until the draw falls inside
/// a band. Non-finite or negative weights count as zero. When every weight is zero the
/// draw is uniform. Returns `None` only for an empty slice.
///
/// # Examples
///
/// ```
/// use mazecrawl::weighted_index;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(1);
/// assert_eq!(weighted_index(&[0.0, 5.0, 0.0], &mut rng), Some(1));
/// assert_eq!(weighted_index(&[], &mut rng), None);
/// ```
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let sanitized = |weight: f64| {
        if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            0.0
        }
    };
    let total: f64 = weights.iter().copied().map(sanitized).sum();
    if total <= 0.0 {
        return Some(rng.gen_range(0..weights.len()));
    }

    let mut draw = rng.gen::<f64>() * total;
    for (index, weight) in weights.iter().copied().map(sanitized).enumerate() {
        if draw < weight {
            return Some(index);
        }
        draw -= weight;
    }
    // Rounding can leave the draw just past the last band.
    weights.iter().rposition(|weight| sanitized(*weight) > 0.0)
}
