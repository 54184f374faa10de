//! Reducers that collapse a per-day score series into one value.
//!
//! Series are ordered oldest to newest; recency-sensitive reducers rely
//! on that ordering. Undefined reductions (empty input, zero divisor,
//! non-finite result) yield missing rather than ±∞ or NaN.

use serde::{Deserialize, Serialize};

/// How to reduce a per-security series of daily scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Arithmetic mean.
    Mean,
    /// Recency-weighted mean, oldest observation weighted 1.
    WeightedMean,
    /// Exponentially-weighted mean with α = 2 / (1 + lag).
    ExpWeightedMean {
        /// Window length the smoothing constant derives from.
        lag: usize,
    },
    /// Median.
    Median,
    /// Sample standard deviation.
    Std,
    /// Coefficient of variation, mean / std.
    CoV,
    /// Product of the observations.
    Product,
}

impl Aggregation {
    /// Reduce an ordered (oldest first) series to one value.
    ///
    /// Returns `None` when the reduction is undefined for the input.
    pub fn reduce(&self, series: &[f64]) -> Option<f64> {
        if series.is_empty() {
            return None;
        }
        let out = match self {
            Self::Mean => mean(series)?,
            Self::WeightedMean => {
                let total: f64 = (1..=series.len()).map(|w| w as f64).sum();
                series
                    .iter()
                    .enumerate()
                    .map(|(i, x)| (i + 1) as f64 * x)
                    .sum::<f64>()
                    / total
            }
            Self::ExpWeightedMean { lag } => {
                let alpha = 2.0 / (1.0 + (*lag).max(1) as f64);
                let mut acc = series[0];
                for x in &series[1..] {
                    acc = alpha * x + (1.0 - alpha) * acc;
                }
                acc
            }
            Self::Median => {
                let mut sorted = series.to_vec();
                sorted.sort_unstable_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    sorted[mid]
                } else {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                }
            }
            Self::Std => sample_std(series)?,
            Self::CoV => mean(series)? / sample_std(series)?,
            Self::Product => series.iter().product(),
        };
        Some(out).filter(|x| x.is_finite())
    }
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_mean() {
        assert_relative_eq!(
            Aggregation::Mean.reduce(&[1.0, 2.0, 3.0]).unwrap(),
            2.0
        );
    }

    #[test]
    fn test_weighted_mean_favors_recent() {
        // weights 1, 2, 3 over [1, 2, 3]: (1 + 4 + 9) / 6
        assert_relative_eq!(
            Aggregation::WeightedMean.reduce(&[1.0, 2.0, 3.0]).unwrap(),
            14.0 / 6.0
        );
    }

    #[test]
    fn test_exp_weighted_mean() {
        // lag 3 gives alpha 0.5: ((1*0.5 + 2)*0.5 + 3)*0.5... folded forward
        let got = Aggregation::ExpWeightedMean { lag: 3 }
            .reduce(&[1.0, 2.0, 3.0])
            .unwrap();
        assert_relative_eq!(got, 0.5 * 3.0 + 0.5 * (0.5 * 2.0 + 0.5 * 1.0));
    }

    #[rstest]
    #[case(&[3.0, 1.0, 2.0], 2.0)]
    #[case(&[4.0, 1.0, 2.0, 3.0], 2.5)]
    fn test_median(#[case] series: &[f64], #[case] expected: f64) {
        assert_relative_eq!(Aggregation::Median.reduce(series).unwrap(), expected);
    }

    #[test]
    fn test_std() {
        assert_relative_eq!(
            Aggregation::Std.reduce(&[1.0, 2.0, 3.0]).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_cov() {
        assert_relative_eq!(Aggregation::CoV.reduce(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_cov_zero_dispersion_is_missing() {
        assert_eq!(Aggregation::CoV.reduce(&[2.0, 2.0, 2.0]), None);
        assert_eq!(Aggregation::CoV.reduce(&[5.0]), None);
    }

    #[test]
    fn test_product() {
        assert_relative_eq!(
            Aggregation::Product.reduce(&[2.0, 3.0, 4.0]).unwrap(),
            24.0
        );
    }

    #[test]
    fn test_empty_is_missing() {
        assert_eq!(Aggregation::Mean.reduce(&[]), None);
        assert_eq!(Aggregation::Product.reduce(&[]), None);
    }
}
