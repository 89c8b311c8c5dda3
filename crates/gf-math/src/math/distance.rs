//! Distances between fixed-dimension points.

/// Plain Euclidean distance.
pub fn euclidean<const K: usize>(a: &[f64; K], b: &[f64; K]) -> f64 {
    let mut sum = 0.0;
    for i in 0..K {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum.sqrt()
}

/// Weighted Euclidean distance `sqrt(sum(w_i^2 * (a_i - b_i)^2))`.
///
/// Weights enter squared, so a dimension with twice the weight contributes
/// twice the distance for the same coordinate gap.
pub fn weighted_euclidean<const K: usize>(a: &[f64; K], b: &[f64; K], weights: &[f64; K]) -> f64 {
    let mut sum = 0.0;
    for i in 0..K {
        let d = weights[i] * (a[i] - b[i]);
        sum += d * d;
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_345() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn unit_weights_match_euclidean() {
        let a = [0.3, -1.2, 2.0, 0.0];
        let b = [1.0, 0.5, -0.4, 0.9];
        let w = [1.0; 4];
        assert!((weighted_euclidean(&a, &b, &w) - euclidean(&a, &b)).abs() < 1e-12);
    }

    #[test]
    fn weight_scales_dimension_linearly() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        assert_eq!(weighted_euclidean(&a, &b, &[2.0, 1.0]), 2.0);
        assert_eq!(weighted_euclidean(&a, &b, &[-2.0, 1.0]), 2.0);
    }
}
