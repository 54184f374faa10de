//! Memoized standard normal CDF.
//!
//! Batch trade-direction assignment evaluates Φ over many standardized
//! returns that repeat once rounded. Each factor instance owns its own
//! memo table; entries are keyed on the argument rounded to two decimals
//! and the domain is clamped to |x| ≤ 4, where Φ is numerically 0 or 1.

use std::cell::RefCell;
use std::collections::HashMap;

const CLAMP: f64 = 4.0;

/// Standard normal CDF with an instance-owned memo table.
#[derive(Debug, Default)]
pub struct NormalCdf {
    cache: RefCell<HashMap<i32, f64>>,
}

impl NormalCdf {
    /// An empty memo table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Φ(x), memoized at two-decimal resolution.
    ///
    /// Non-finite arguments are treated as ±∞ and map to 0 or 1.
    pub fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.5;
        }
        let clamped = x.clamp(-CLAMP, CLAMP);
        let key = (clamped * 100.0).round() as i32;
        if let Some(v) = self.cache.borrow().get(&key) {
            return *v;
        }
        let v = phi(key as f64 / 100.0);
        self.cache.borrow_mut().insert(key, v);
        v
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether the memo table is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

fn phi(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz and Stegun 7.1.26, max absolute error 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.5)]
    #[case(1.0, 0.841345)]
    #[case(-1.0, 0.158655)]
    #[case(1.96, 0.975002)]
    #[case(-1.96, 0.024998)]
    fn test_known_values(#[case] x: f64, #[case] expected: f64) {
        let cdf = NormalCdf::new();
        assert_relative_eq!(cdf.cdf(x), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_tails_clamped() {
        let cdf = NormalCdf::new();
        assert_relative_eq!(cdf.cdf(10.0), cdf.cdf(4.0));
        assert_relative_eq!(cdf.cdf(-10.0), cdf.cdf(-4.0));
        assert!(cdf.cdf(4.0) > 0.99996);
        assert!(cdf.cdf(-4.0) < 0.00004);
    }

    #[test]
    fn test_memo_dedupes_rounded_keys() {
        let cdf = NormalCdf::new();
        cdf.cdf(1.234);
        cdf.cdf(1.2351);
        cdf.cdf(1.2449);
        assert_eq!(cdf.len(), 2);
    }

    #[test]
    fn test_nan_is_half() {
        let cdf = NormalCdf::new();
        assert_relative_eq!(cdf.cdf(f64::NAN), 0.5);
        assert!(cdf.is_empty());
    }

    #[test]
    fn test_monotone() {
        let cdf = NormalCdf::new();
        let mut prev = cdf.cdf(-4.0);
        for i in -39..=40 {
            let cur = cdf.cdf(i as f64 / 10.0);
            assert!(cur >= prev);
            prev = cur;
        }
    }
}
