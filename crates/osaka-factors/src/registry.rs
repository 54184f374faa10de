//! Factor registry: metadata and lookup for the built-in factors.

use osaka_traits::Direction;
use std::collections::HashMap;

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorCategory {
    /// Value factors (earnings yield)
    Value,
    /// Volume factors (trade-direction splits)
    Volume,
    /// Volatility factors (windowed return volatility)
    Volatility,
}

/// Factor metadata
#[derive(Debug, Clone)]
pub struct FactorInfo {
    /// Factor symbol (unique identifier)
    pub name: &'static str,
    /// Factor category
    pub category: FactorCategory,
    /// Direction of the raw signal
    pub direction: Direction,
    /// Brief description of what the factor measures
    pub description: &'static str,
    /// Feed items the factor consumes
    pub required_items: &'static [&'static str],
}

/// Get all available factor info
pub fn available_factors() -> Vec<FactorInfo> {
    vec![
        FactorInfo {
            name: "EP",
            category: FactorCategory::Value,
            direction: Direction::Long,
            description: "Earnings yield, reciprocal of the P/E ratio",
            required_items: &["pe_ratio"],
        },
        FactorInfo {
            name: "vdir_buy",
            category: FactorCategory::Volume,
            direction: Direction::Long,
            description: "Buy volume share from batch trade-direction assignment",
            required_items: &["close", "pre_close", "volume"],
        },
        FactorInfo {
            name: "vdir_pin",
            category: FactorCategory::Volume,
            direction: Direction::Long,
            description: "Informed-trading probability, absolute buy/sell imbalance",
            required_items: &["close", "pre_close", "volume"],
        },
        FactorInfo {
            name: "vdir_buy_std",
            category: FactorCategory::Volume,
            direction: Direction::Long,
            description: "Buy volume volatility share across intraday bars",
            required_items: &["close", "pre_close", "volume"],
        },
        FactorInfo {
            name: "vdir_std_imb",
            category: FactorCategory::Volume,
            direction: Direction::Long,
            description: "Absolute buy/sell volume volatility imbalance",
            required_items: &["close", "pre_close", "volume"],
        },
        FactorInfo {
            name: "window_vol",
            category: FactorCategory::Volatility,
            direction: Direction::Short,
            description: "Return volatility over the rolling trade window",
            required_items: &["close", "pre_close"],
        },
    ]
}

/// Get factors by category
pub fn factors_by_category(category: FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.category == category)
        .collect()
}

/// Get factor info by name
pub fn get_factor_info(name: &str) -> Option<FactorInfo> {
    available_factors().into_iter().find(|f| f.name == name)
}

/// Get a map of all factors indexed by name
pub fn factor_map() -> HashMap<&'static str, FactorInfo> {
    available_factors()
        .into_iter()
        .map(|f| (f.name, f))
        .collect()
}

/// List all factor names
pub fn list_factor_names() -> Vec<&'static str> {
    available_factors().into_iter().map(|f| f.name).collect()
}
