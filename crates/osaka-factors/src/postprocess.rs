//! Post-processing chain for factor cross-sections.
//!
//! Pure functions over a security → value mapping, applied in order:
//! missing-value policy, outlier policy, standardization policy. The
//! standardization step is oriented by the factor direction so that
//! higher processed values always mean better.

use osaka_traits::{CrossSection, Direction};
use serde::{Deserialize, Serialize};

/// How to treat missing values before the later stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Leave missing values in place.
    Keep,
    /// Drop securities with missing values.
    Drop,
    /// Replace missing values with the cross-sectional mean.
    FillMean,
    /// Replace missing values with a constant.
    Fill(f64),
}

/// How to treat outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierPolicy {
    /// Leave values in place.
    Keep,
    /// Clip to the given percentile bounds.
    Winsorize {
        /// Lower percentile, e.g. 0.01.
        lower: f64,
        /// Upper percentile, e.g. 0.99.
        upper: f64,
    },
    /// Clip to median ± `max_dev` scaled median absolute deviations.
    ClipMad {
        /// Number of scaled MADs tolerated on each side.
        max_dev: f64,
    },
}

/// How to standardize the cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardizePolicy {
    /// Leave values on their raw scale.
    Keep,
    /// Cross-sectional z-score, multiplied by the factor direction.
    ZScore,
}

/// The configured post-processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostProcess {
    /// Missing-value stage.
    pub missing: MissingPolicy,
    /// Outlier stage.
    pub outlier: OutlierPolicy,
    /// Standardization stage.
    pub standardize: StandardizePolicy,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::Keep,
            outlier: OutlierPolicy::Winsorize {
                lower: 0.01,
                upper: 0.99,
            },
            standardize: StandardizePolicy::ZScore,
        }
    }
}

impl PostProcess {
    /// A chain that passes values through untouched.
    pub const fn passthrough() -> Self {
        Self {
            missing: MissingPolicy::Keep,
            outlier: OutlierPolicy::Keep,
            standardize: StandardizePolicy::Keep,
        }
    }

    /// Run the chain over a cross-section.
    pub fn apply(&self, values: &CrossSection, direction: Direction) -> CrossSection {
        let step = apply_missing(values, self.missing);
        let step = apply_outlier(&step, self.outlier);
        apply_standardize(&step, self.standardize, direction)
    }
}

fn valid(values: &CrossSection) -> Vec<f64> {
    values.values().filter_map(|v| *v).collect()
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

/// Linear-interpolated quantile of a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

fn median(sorted: &[f64]) -> Option<f64> {
    quantile(sorted, 0.5)
}

fn apply_missing(values: &CrossSection, policy: MissingPolicy) -> CrossSection {
    match policy {
        MissingPolicy::Keep => values.clone(),
        MissingPolicy::Drop => values
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        MissingPolicy::FillMean => {
            let fill = mean(&valid(values));
            values
                .iter()
                .map(|(k, v)| (k.clone(), v.or(fill)))
                .collect()
        }
        MissingPolicy::Fill(fill) => values
            .iter()
            .map(|(k, v)| (k.clone(), v.or(Some(fill))))
            .collect(),
    }
}

fn apply_outlier(values: &CrossSection, policy: OutlierPolicy) -> CrossSection {
    let (lo, hi) = match policy {
        OutlierPolicy::Keep => return values.clone(),
        OutlierPolicy::Winsorize { lower, upper } => {
            let mut sorted = valid(values);
            sorted.sort_unstable_by(f64::total_cmp);
            match (quantile(&sorted, lower), quantile(&sorted, upper)) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => return values.clone(),
            }
        }
        OutlierPolicy::ClipMad { max_dev } => {
            // MAD scaling factor for consistency with normal distribution
            const MAD_SCALE: f64 = 1.4826;
            let mut sorted = valid(values);
            sorted.sort_unstable_by(f64::total_cmp);
            let Some(med) = median(&sorted) else {
                return values.clone();
            };
            let mut devs: Vec<f64> = sorted.iter().map(|x| (x - med).abs()).collect();
            devs.sort_unstable_by(f64::total_cmp);
            let Some(mad) = median(&devs) else {
                return values.clone();
            };
            let band = max_dev * mad * MAD_SCALE;
            (med - band, med + band)
        }
    };
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.map(|x| x.clamp(lo, hi))))
        .collect()
}

fn apply_standardize(
    values: &CrossSection,
    policy: StandardizePolicy,
    direction: Direction,
) -> CrossSection {
    match policy {
        StandardizePolicy::Keep => values.clone(),
        StandardizePolicy::ZScore => {
            let scored = zscore(values);
            scored
                .into_iter()
                .map(|(k, v)| (k, v.map(|z| z * direction.as_f64())))
                .collect()
        }
    }
}

/// Plain cross-sectional z-score; degenerate cross-sections (fewer than
/// two valid values, or zero dispersion) standardize to missing.
pub fn zscore(values: &CrossSection) -> CrossSection {
    let xs = valid(values);
    let (m, s) = (mean(&xs), sample_std(&xs));
    values
        .iter()
        .map(|(k, v)| {
            let z = match (v, m, s) {
                (Some(x), Some(m), Some(s)) if s > 0.0 => Some((x - m) / s),
                _ => None,
            };
            (k.clone(), z.filter(|x| x.is_finite()))
        })
        .collect()
}
