//! Return volatility over the incremental trade window.

use crate::window::TradeDataWindow;
use osaka_data::{DataFeed, Frequency};
use osaka_traits::{
    value_frame, CrossSection, Date, Direction, FactorCompute, FactorSpec, Result,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Standard deviation of per-bar returns over a rolling trade window.
///
/// Low-volatility factor: direction is short, so calmer securities rank
/// higher after standardization. Securities with insufficient valid bars
/// in the window are missing.
pub struct WindowVolatilityFactor {
    spec: FactorSpec,
    feed: Rc<dyn DataFeed>,
    window: TradeDataWindow,
}

impl fmt::Debug for WindowVolatilityFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowVolatilityFactor")
            .field("spec", &self.spec)
            .field("window", &self.window)
            .finish()
    }
}

impl WindowVolatilityFactor {
    /// Symbol "window_vol" over a 20-day daily-bar window.
    pub fn new(feed: Rc<dyn DataFeed>) -> Result<Self> {
        Self::with_window(
            feed,
            TradeDataWindow::new(20, Frequency::Daily, &["close", "pre_close"]),
        )
    }

    /// Use a custom window configuration.
    pub fn with_window(feed: Rc<dyn DataFeed>, window: TradeDataWindow) -> Result<Self> {
        Ok(Self {
            spec: FactorSpec::new("window_vol", Direction::Short)?,
            feed,
            window,
        })
    }

    /// The underlying trade-data window.
    pub fn window(&self) -> &TradeDataWindow {
        &self.window
    }
}

impl FactorCompute for WindowVolatilityFactor {
    fn spec(&self) -> &FactorSpec {
        &self.spec
    }

    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        let min_rows = self.window.min_rows();
        let feed = Rc::clone(&self.feed);
        let state = self.window.refresh(feed.as_ref(), date)?;

        let ids = state.frame.column("security_id")?.str()?;
        let close = state.frame.column("close")?.cast(&DataType::Float64)?;
        let close = close.f64()?;
        let pre = state.frame.column("pre_close")?.cast(&DataType::Float64)?;
        let pre = pre.f64()?;

        let mut returns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for ((id, c), p) in ids.into_iter().zip(close).zip(pre) {
            let (Some(id), Some(c), Some(p)) = (id, c, p) else {
                continue;
            };
            if p == 0.0 {
                continue;
            }
            let ret = c / p - 1.0;
            if ret.is_finite() {
                returns.entry(id.to_string()).or_default().push(ret);
            }
        }

        let mut values = CrossSection::new();
        for id in &state.universe {
            let value = returns
                .get(id)
                .filter(|xs| xs.len() >= min_rows)
                .and_then(|xs| sample_std(xs))
                .filter(|x| x.is_finite());
            values.insert(id.clone(), value);
        }
        value_frame(date, &values)
    }
}

fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = xs.iter().sum::<f64>() / xs.len() as f64;
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}
