//! Earnings yield ("EP") factor.

use osaka_data::DataFeed;
use osaka_traits::{
    value_frame, CrossSection, Date, Direction, FactorCompute, FactorSpec, Result,
};
use polars::prelude::*;
use std::fmt;
use std::rc::Rc;

/// Reciprocal of the price-to-earnings ratio for the universe at a date.
///
/// A zero or missing P/E yields a missing value; negative P/E passes
/// through as a negative yield.
pub struct EarningsYieldFactor {
    spec: FactorSpec,
    feed: Rc<dyn DataFeed>,
    item: String,
}

impl fmt::Debug for EarningsYieldFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EarningsYieldFactor")
            .field("spec", &self.spec)
            .field("item", &self.item)
            .finish()
    }
}

impl EarningsYieldFactor {
    /// Symbol "EP", long direction, reading the `pe_ratio` day variable.
    pub fn new(feed: Rc<dyn DataFeed>) -> Result<Self> {
        Ok(Self {
            spec: FactorSpec::new("EP", Direction::Long)?,
            feed,
            item: "pe_ratio".to_string(),
        })
    }

    /// Read a differently-named P/E day variable.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = item.into();
        self
    }
}

impl FactorCompute for EarningsYieldFactor {
    fn spec(&self) -> &FactorSpec {
        &self.spec
    }

    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        let universe = self.feed.security_codes(date)?;
        let vars = self
            .feed
            .day_variables(&[date], &universe, &[self.item.clone()])?;

        let ids = vars.column("security_id")?.str()?;
        let pe = vars.column(self.item.as_str())?.cast(&DataType::Float64)?;
        let pe = pe.f64()?;

        let mut values = CrossSection::new();
        for (id, pe) in ids.into_iter().zip(pe) {
            let Some(id) = id else { continue };
            let ep = pe.map(|p| 1.0 / p).filter(|x| x.is_finite());
            values.insert(id.to_string(), ep);
        }
        // Universe members the feed returned no row for are still missing.
        for id in &universe {
            values.entry(id.clone()).or_insert(None);
        }
        value_frame(date, &values)
    }
}
