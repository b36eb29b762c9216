//! The traded instrument.

use rust_decimal::Decimal;

/// Holds the last traded price of the single instrument a book trades.
///
/// Only a completed match moves the price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    symbol: String,
    last_price: Decimal,
}

impl Stock {
    /// Create an instrument with its opening price.
    ///
    /// Returns `None` unless `opening_price` is positive.
    pub fn new(symbol: impl Into<String>, opening_price: Decimal) -> Option<Self> {
        (opening_price > Decimal::ZERO).then(|| Self {
            symbol: symbol.into(),
            last_price: opening_price,
        })
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn last_price(&self) -> Decimal {
        self.last_price
    }

    pub(crate) fn record_trade(&mut self, price: Decimal) {
        debug_assert!(price > Decimal::ZERO);
        self.last_price = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_requires_positive_price() {
        assert!(Stock::new("ACME", Decimal::ZERO).is_none());
        assert!(Stock::new("ACME", Decimal::from(-1)).is_none());

        let stock = Stock::new("ACME", Decimal::from(10)).unwrap();
        assert_eq!(stock.symbol(), "ACME");
        assert_eq!(stock.last_price(), Decimal::from(10));
    }

    #[test]
    fn test_record_trade() {
        let mut stock = Stock::new("ACME", Decimal::from(10)).unwrap();
        stock.record_trade(Decimal::new(95, 1));
        assert_eq!(stock.last_price(), Decimal::new(95, 1));
    }
}
