//! Price history access port trait.

use crate::domain::error::RebalancerError;
use crate::domain::price::PriceSeries;

pub trait PriceSource {
    /// Full adjusted-close history of one instrument, oldest first.
    fn fetch_prices(&self, code: &str) -> Result<PriceSeries, RebalancerError>;

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError>;
}
