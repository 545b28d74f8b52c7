//! Order request construction.

use rust_decimal::Decimal;
use tvb_core::TvbError;
use tvb_core::config::TradingOptions;
use tvb_core::trading::{OrderIntent, OrderKind, OrderRequest};
use tvb_core::types::{Side, TimeInForce};

/// Limit pricing inputs taken from the trading options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOptions {
    /// Emit limit orders instead of market orders.
    pub use_limit: bool,
    /// Offset applied at or below `threshold`.
    pub offset_absolute: Decimal,
    /// Offset as a fraction of the price, applied above `threshold`.
    pub offset_fraction: Decimal,
    pub threshold: Decimal,
}

impl LimitOptions {
    pub fn from_options(options: &TradingOptions) -> Self {
        Self {
            use_limit: options.limit,
            offset_absolute: options.limit_amt,
            offset_fraction: options.limit_perc,
            threshold: options.limit_threshold,
        }
    }

    /// Offset for one request. Never stored back into the options.
    fn offset_for(&self, reference_price: Decimal) -> Decimal {
        if reference_price > self.threshold {
            reference_price * self.offset_fraction
        } else {
            self.offset_absolute
        }
    }
}

/// Build the request for a non-zero intent.
///
/// Limit buys are priced above the reference and limit sells below it, so a
/// moving quote still fills. Prices are rounded to cents.
pub fn build(
    symbol: &str,
    intent: &OrderIntent,
    reference_price: Decimal,
    options: &LimitOptions,
) -> Result<OrderRequest, TvbError> {
    if intent.is_no_action() {
        return Err(TvbError::Order(format!("zero quantity {} order for {symbol}", intent.side)));
    }
    if !options.use_limit {
        return Ok(market(symbol, intent.side, intent.quantity));
    }

    let offset = options.offset_for(reference_price);
    let limit_price = match intent.side {
        Side::Buy => reference_price + offset,
        Side::Sell => reference_price - offset,
    }
    .round_dp(2);

    Ok(OrderRequest {
        symbol: symbol.to_string(),
        side: intent.side,
        quantity: intent.quantity,
        kind: OrderKind::Limit { limit_price },
        time_in_force: TimeInForce::GoodTillCanceled,
    })
}

/// Market request, as used by timeout escalation.
pub fn market(symbol: &str, side: Side, quantity: u64) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        quantity,
        kind: OrderKind::Market,
        time_in_force: TimeInForce::GoodTillCanceled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> LimitOptions {
        LimitOptions {
            use_limit: true,
            offset_absolute: dec!(0.04),
            offset_fraction: dec!(0.0005),
            threshold: dec!(100),
        }
    }

    #[test]
    fn market_when_limit_disabled() {
        let opts = LimitOptions { use_limit: false, ..limits() };
        let req = build("MSFT", &OrderIntent::new(Side::Buy, 59), dec!(337.57), &opts).unwrap();
        assert!(req.is_market());
        assert_eq!(req.symbol, "MSFT");
        assert_eq!(req.side, Side::Buy);
        assert_eq!(req.quantity, 59);
        assert_eq!(req.time_in_force, TimeInForce::GoodTillCanceled);
    }

    #[test]
    fn absolute_offset_below_threshold() {
        let buy = build("CLSK", &OrderIntent::new(Side::Buy, 10), dec!(4.015), &limits()).unwrap();
        assert_eq!(buy.limit_price(), Some(dec!(4.06)));

        let sell = build("CLSK", &OrderIntent::new(Side::Sell, 10), dec!(4.015), &limits()).unwrap();
        assert_eq!(sell.limit_price(), Some(dec!(3.98)));
    }

    #[test]
    fn threshold_is_exclusive() {
        let req = build("X", &OrderIntent::new(Side::Buy, 1), dec!(100), &limits()).unwrap();
        assert_eq!(req.limit_price(), Some(dec!(100.04)));
    }

    #[test]
    fn fractional_offset_above_threshold() {
        // 337.57 × 0.0005 = 0.168785
        let buy = build("MSFT", &OrderIntent::new(Side::Buy, 59), dec!(337.57), &limits()).unwrap();
        assert_eq!(buy.limit_price(), Some(dec!(337.74)));

        let sell = build("MSFT", &OrderIntent::new(Side::Sell, 59), dec!(337.57), &limits()).unwrap();
        assert_eq!(sell.limit_price(), Some(dec!(337.40)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = build("MSFT", &OrderIntent::no_action(Side::Buy), dec!(1), &limits()).unwrap_err();
        assert!(matches!(err, TvbError::Order(_)));
    }
}
