//! Volume direction scorer: batch trade-direction assignment.
//!
//! Each intraday bar's volume is split into a buy and a sell portion by
//! mapping the bar's standardized return through the normal CDF. The
//! standardization pools all bars of the day across all securities, so
//! a bar's buy probability reflects how unusual its return was that day.
//! Four measures summarize the split per security.

use crate::cdf::NormalCdf;
use crate::daily::{DailyCachedFactor, DailyScorer};
use osaka_data::DataFeed;
use osaka_traits::{CrossSection, Direction, FactorSpec, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Which per-security summary of the buy/sell split to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionMeasure {
    /// Buy volume share: Σbuy / (Σbuy + Σsell).
    BuyShare,
    /// Informed-trading probability: |Σbuy − Σsell| / (Σbuy + Σsell).
    InformedTrading,
    /// Buy volatility share: σ(buy) / (σ(buy) + σ(sell)).
    BuyVolStdShare,
    /// Volatility imbalance: |σ(buy) − σ(sell)| / (σ(buy) + σ(sell)).
    VolStdImbalance,
}

impl DirectionMeasure {
    /// Factor symbol for this measure.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::BuyShare => "vdir_buy",
            Self::InformedTrading => "vdir_pin",
            Self::BuyVolStdShare => "vdir_buy_std",
            Self::VolStdImbalance => "vdir_std_imb",
        }
    }
}

/// Per-day scorer splitting bar volume into buy and sell portions.
#[derive(Debug)]
pub struct VolumeDirectionScorer {
    measure: DirectionMeasure,
    cdf: NormalCdf,
}

impl VolumeDirectionScorer {
    /// Scorer for the given measure with a fresh CDF memo.
    pub fn new(measure: DirectionMeasure) -> Self {
        Self {
            measure,
            cdf: NormalCdf::new(),
        }
    }

    /// The configured measure.
    pub const fn measure(&self) -> DirectionMeasure {
        self.measure
    }
}

impl DailyScorer for VolumeDirectionScorer {
    fn items(&self) -> Vec<String> {
        vec![
            "close".to_string(),
            "pre_close".to_string(),
            "volume".to_string(),
        ]
    }

    fn score_day(&self, bars: &DataFrame) -> Result<CrossSection> {
        let ids = bars.column("security_id")?.str()?;
        let close = bars.column("close")?.cast(&DataType::Float64)?;
        let close = close.f64()?;
        let pre = bars.column("pre_close")?.cast(&DataType::Float64)?;
        let pre = pre.f64()?;
        let volume = bars.column("volume")?.cast(&DataType::Float64)?;
        let volume = volume.f64()?;

        // Bar returns, pooled across the whole day for standardization.
        let mut rows: Vec<(String, f64, f64)> = Vec::with_capacity(bars.height());
        for (((id, c), p), v) in ids.into_iter().zip(close).zip(pre).zip(volume) {
            let (Some(id), Some(c), Some(p), Some(v)) = (id, c, p, v) else {
                continue;
            };
            if p == 0.0 || v < 0.0 {
                continue;
            }
            let ret = c / p - 1.0;
            if ret.is_finite() {
                rows.push((id.to_string(), ret, v));
            }
        }

        let rets: Vec<f64> = rows.iter().map(|(_, r, _)| *r).collect();
        let (Some(m), Some(s)) = (mean(&rets), sample_std(&rets)) else {
            return Ok(rows.into_iter().map(|(id, _, _)| (id, None)).collect());
        };
        if s == 0.0 {
            return Ok(rows.into_iter().map(|(id, _, _)| (id, None)).collect());
        }

        let mut splits: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for (id, ret, vol) in rows {
            let up = self.cdf.cdf((ret - m) / s) * vol;
            let down = vol - up;
            let entry = splits.entry(id).or_default();
            entry.0.push(up);
            entry.1.push(down);
        }

        let out = splits
            .into_iter()
            .map(|(id, (ups, downs))| {
                let value = match self.measure {
                    DirectionMeasure::BuyShare => {
                        let (su, sd) = (sum(&ups), sum(&downs));
                        Some(su / (su + sd))
                    }
                    DirectionMeasure::InformedTrading => {
                        let (su, sd) = (sum(&ups), sum(&downs));
                        Some((su - sd).abs() / (su + sd))
                    }
                    DirectionMeasure::BuyVolStdShare => match (sample_std(&ups), sample_std(&downs))
                    {
                        (Some(a), Some(b)) => Some(a / (a + b)),
                        _ => None,
                    },
                    DirectionMeasure::VolStdImbalance => {
                        match (sample_std(&ups), sample_std(&downs)) {
                            (Some(a), Some(b)) => Some((a - b).abs() / (a + b)),
                            _ => None,
                        }
                    }
                };
                (id, value.filter(|x| x.is_finite()))
            })
            .collect();
        Ok(out)
    }
}

/// Daily-cached volume direction factor for the given measure.
pub fn volume_direction_factor(
    feed: Rc<dyn DataFeed>,
    measure: DirectionMeasure,
) -> Result<DailyCachedFactor<VolumeDirectionScorer>> {
    let spec = FactorSpec::new(measure.symbol(), Direction::Long)?;
    Ok(DailyCachedFactor::new(
        spec,
        feed,
        VolumeDirectionScorer::new(measure),
    ))
}

fn sum(xs: &[f64]) -> f64 {
    xs.iter().sum()
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

    fn bars(rows: &[(&str, f64, f64, f64)]) -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                "security_id".into(),
                rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
            )
            .into(),
            Series::new("close".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()).into(),
            Series::new(
                "pre_close".into(),
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            )
            .into(),
            Series::new(
                "volume".into(),
                rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            )
            .into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_buy_share_bounded() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::BuyShare);
        let df = bars(&[
            ("A", 101.0, 100.0, 1000.0),
            ("A", 102.0, 101.0, 1200.0),
            ("B", 99.0, 100.0, 800.0),
            ("B", 98.5, 99.0, 900.0),
        ]);
        let out = scorer.score_day(&df).unwrap();
        let a = out["A"].unwrap();
        let b = out["B"].unwrap();
        assert!((0.0..=1.0).contains(&a));
        assert!((0.0..=1.0).contains(&b));
        // A rallied while B sold off, so A's buy share must dominate.
        assert!(a > b);
    }

    #[test]
    fn test_informed_trading_symmetric() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::InformedTrading);
        let df = bars(&[
            ("A", 105.0, 100.0, 1000.0),
            ("B", 100.0, 105.0, 1000.0),
            ("C", 100.0, 100.0, 1000.0),
        ]);
        let out = scorer.score_day(&df).unwrap();
        // One-sided movers carry more directional information than the flat one.
        assert!(out["A"].unwrap() > out["C"].unwrap());
        assert!(out["B"].unwrap() > out["C"].unwrap());
    }

    #[test]
    fn test_std_measures_need_two_bars() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::BuyVolStdShare);
        let df = bars(&[
            ("A", 101.0, 100.0, 1000.0),
            ("B", 99.0, 100.0, 800.0),
            ("B", 98.0, 99.0, 900.0),
        ]);
        let out = scorer.score_day(&df).unwrap();
        assert_eq!(out["A"], None);
        assert!(out["B"].is_some());
    }

    #[test]
    fn test_degenerate_day_is_missing() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::BuyShare);
        // Identical returns give zero dispersion to standardize against.
        let df = bars(&[("A", 101.0, 100.0, 1000.0), ("B", 101.0, 100.0, 500.0)]);
        let out = scorer.score_day(&df).unwrap();
        assert_eq!(out["A"], None);
        assert_eq!(out["B"], None);
    }

    #[test]
    fn test_zero_pre_close_skipped() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::BuyShare);
        let df = bars(&[
            ("A", 101.0, 0.0, 1000.0),
            ("B", 101.0, 100.0, 500.0),
            ("C", 99.0, 100.0, 500.0),
        ]);
        let out = scorer.score_day(&df).unwrap();
        assert!(!out.contains_key("A"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_shares_sum_to_one_for_mirrored_flows() {
        let scorer = VolumeDirectionScorer::new(DirectionMeasure::BuyShare);
        let df = bars(&[
            ("A", 102.0, 100.0, 1000.0),
            ("B", 100.0, 102.0, 1000.0),
            ("C", 101.0, 100.0, 1000.0),
            ("D", 100.0, 101.0, 1000.0),
        ]);
        let out = scorer.score_day(&df).unwrap();
        // Buy share plus the mirrored security's buy share is 1 up to CDF symmetry.
        assert_relative_eq!(
            out["A"].unwrap() + out["B"].unwrap(),
            1.0,
            epsilon = 1e-2
        );
    }
}
