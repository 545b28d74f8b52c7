//! Position sizing.
//!
//! [`decide`] maps a signal and the current holding to an [`OrderIntent`].
//! The rules are a decision table keyed on `(action, hint, shorting, holding)`;
//! the first matching arm wins.
//!
//! | action             | hint           | shorting | holding | → side | → quantity       |
//! |--------------------|----------------|----------|---------|--------|------------------|
//! | Open               | Short          | no       | flat    | Sell   | 0                |
//! | Open               | Short          | *        | long    | Sell   | full long        |
//! | Open               | Short          | yes      | flat    | Sell   | cash-sized       |
//! | Open               | Short          | *        | short   | Sell   | 0                |
//! | Close              | Short          | *        | short   | Buy    | full short       |
//! | Close              | Short          | *        | other   | Buy    | 0                |
//! | Bull / Buy / Open  | Long or absent | *        | flat    | Buy    | cash-sized       |
//! | Bull / Buy / Open  | Long or absent | *        | other   | Buy    | 0                |
//! | Bear / Sell / Close| Long or absent | *        | long    | Sell   | full long        |
//! | Bear / Sell / Close| Long or absent | *        | other   | Sell   | 0                |
//! | anything else      |                |          |         | `UnhandledSignal`        |
//!
//! A quantity of zero is a no-op. Open+Short against an existing long only
//! flattens; opening the short is left to a later signal.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};
use tvb_core::TvbError;
use tvb_core::config::{TEST_MODE_BALANCE, TradingOptions};
use tvb_core::trading::{AccountState, OrderIntent, PositionState};
use tvb_core::types::{PositionHint, Side, SignalAction, TradeSignal};

/// Sizing inputs taken from the trading options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingOptions {
    /// Opening short positions is allowed.
    pub shorting_enabled: bool,
    /// Fraction of the balance spent per new entry.
    pub buy_fraction: Decimal,
    /// Fixed balance used instead of the account cash.
    pub test_balance: Option<Decimal>,
}

impl SizingOptions {
    pub fn from_options(options: &TradingOptions) -> Self {
        Self {
            shorting_enabled: options.short,
            buy_fraction: options.buy_perc,
            test_balance: options.test_mode.then_some(TEST_MODE_BALANCE),
        }
    }
}

/// Sign of the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holding {
    Flat,
    Long,
    Short,
}

impl Holding {
    pub fn of(quantity: Decimal) -> Self {
        if quantity > Decimal::ZERO {
            Self::Long
        } else if quantity < Decimal::ZERO {
            Self::Short
        } else {
            Self::Flat
        }
    }
}

/// What the table asks for, before quantities are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Nothing(Side),
    Flatten(Side),
    CashSized(Side),
}

fn rule_for(
    action: SignalAction,
    hint: Option<PositionHint>,
    shorting: bool,
    holding: Holding,
) -> Option<Rule> {
    use Holding::*;
    use PositionHint::{Long as HintLong, Short as HintShort};
    use SignalAction::*;

    let rule = match (action, hint, shorting, holding) {
        (Open, Some(HintShort), false, Flat) => Rule::Nothing(Side::Sell),
        (Open, Some(HintShort), _, Long) => Rule::Flatten(Side::Sell),
        (Open, Some(HintShort), true, Flat) => Rule::CashSized(Side::Sell),
        (Open, Some(HintShort), _, Short) => Rule::Nothing(Side::Sell),

        (Close, Some(HintShort), _, Short) => Rule::Flatten(Side::Buy),
        (Close, Some(HintShort), _, Flat | Long) => Rule::Nothing(Side::Buy),

        (Bull | Buy | Open, None | Some(HintLong), _, Flat) => Rule::CashSized(Side::Buy),
        (Bull | Buy | Open, None | Some(HintLong), _, Long | Short) => Rule::Nothing(Side::Buy),

        (Bear | Sell | Close, None | Some(HintLong), _, Long) => Rule::Flatten(Side::Sell),
        (Bear | Sell | Close, None | Some(HintLong), _, Flat | Short) => Rule::Nothing(Side::Sell),

        _ => return None,
    };
    Some(rule)
}

/// Decide side and quantity for a signal.
///
/// Pure apart from logging: identical inputs always give the same intent.
pub fn decide(
    signal: &TradeSignal,
    position: &PositionState,
    account: &AccountState,
    options: &SizingOptions,
) -> Result<OrderIntent, TvbError> {
    let holding = Holding::of(position.quantity);
    let Some(rule) = rule_for(signal.action, signal.position_hint, options.shorting_enabled, holding) else {
        return Err(TvbError::UnhandledSignal(format!("{signal} with {holding:?} position")));
    };

    let intent = match rule {
        Rule::Nothing(side) => {
            if signal.position_hint == Some(PositionHint::Short) && !options.shorting_enabled && holding == Holding::Flat {
                info!("[sizer] shorting disabled, not opening short: {signal}");
            }
            OrderIntent::no_action(side)
        }
        Rule::Flatten(side) => OrderIntent::new(side, whole_units(signal, position.quantity.abs())),
        Rule::CashSized(side) => OrderIntent::new(side, cash_sized(signal, account, options)),
    };
    Ok(intent)
}

/// `floor(balance × fraction / price)`; zero or less means no order.
fn cash_sized(signal: &TradeSignal, account: &AccountState, options: &SizingOptions) -> u64 {
    let balance = match options.test_balance {
        Some(balance) => balance,
        None if account.cash < Decimal::ZERO => {
            warn!("[sizer] negative cash balance {} treated as zero: {signal}", account.cash);
            Decimal::ZERO
        }
        None => account.cash,
    };

    let Some(quantity) = balance
        .checked_mul(options.buy_fraction)
        .and_then(|budget| budget.checked_div(signal.reference_price))
        .map(|q| q.floor())
    else {
        warn!("[sizer] quantity out of range for balance {balance}, skipping: {signal}");
        return 0;
    };
    if quantity < Decimal::ZERO {
        warn!("[sizer] negative quantity {quantity} computed, skipping: {signal}");
        return 0;
    }
    if quantity.is_zero() {
        info!("[sizer] balance {balance} too small for one unit: {signal}");
        return 0;
    }
    quantity.to_u64().unwrap_or_else(|| {
        warn!("[sizer] quantity {quantity} out of range, skipping: {signal}");
        0
    })
}

/// Whole part of a position being flattened.
fn whole_units(signal: &TradeSignal, quantity: Decimal) -> u64 {
    let whole = quantity.trunc();
    let remainder = quantity - whole;
    if !remainder.is_zero() {
        warn!("[sizer] fractional remainder {remainder} left on {}", signal.symbol);
    }
    whole.to_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ACTIONS: [SignalAction; 6] = [
        SignalAction::Open,
        SignalAction::Close,
        SignalAction::Bull,
        SignalAction::Bear,
        SignalAction::Buy,
        SignalAction::Sell,
    ];
    const HINTS: [Option<PositionHint>; 3] = [None, Some(PositionHint::Long), Some(PositionHint::Short)];

    fn signal(action: SignalAction, hint: Option<PositionHint>, price: Decimal) -> TradeSignal {
        TradeSignal { action, position_hint: hint, symbol: "MSFT".into(), reference_price: price }
    }

    fn opts(shorting: bool) -> SizingOptions {
        SizingOptions { shorting_enabled: shorting, buy_fraction: dec!(0.2), test_balance: None }
    }

    fn run(action: SignalAction, hint: Option<PositionHint>, shorting: bool, qty: Decimal) -> Result<OrderIntent, TvbError> {
        decide(
            &signal(action, hint, dec!(100)),
            &PositionState::with_quantity(qty),
            &AccountState::new(dec!(10000)),
            &opts(shorting),
        )
    }

    #[test]
    fn buy_sized_from_cash() {
        let intent = decide(
            &signal(SignalAction::Buy, None, dec!(337.57)),
            &PositionState::flat(),
            &AccountState::new(dec!(100000)),
            &opts(false),
        )
        .unwrap();
        assert_eq!(intent, OrderIntent::new(Side::Buy, 59));
    }

    #[test]
    fn test_balance_overrides_cash() {
        let options = SizingOptions { test_balance: Some(TEST_MODE_BALANCE), ..opts(false) };
        let intent = decide(
            &signal(SignalAction::Bull, None, dec!(337.57)),
            &PositionState::flat(),
            &AccountState::new(dec!(5)),
            &options,
        )
        .unwrap();
        assert_eq!(intent.quantity, 59);
    }

    #[test]
    fn negative_cash_is_treated_as_zero() {
        let intent = decide(
            &signal(SignalAction::Buy, None, dec!(10)),
            &PositionState::flat(),
            &AccountState::new(dec!(-500)),
            &opts(false),
        )
        .unwrap();
        assert!(intent.is_no_action());
        assert_eq!(intent.side, Side::Buy);
    }

    #[test]
    fn close_long_flattens_regardless_of_price() {
        for price in [dec!(0.01), dec!(1), dec!(99999)] {
            let intent = decide(
                &signal(SignalAction::Close, Some(PositionHint::Long), price),
                &PositionState::with_quantity(dec!(50)),
                &AccountState::new(Decimal::ZERO),
                &opts(false),
            )
            .unwrap();
            assert_eq!(intent, OrderIntent::new(Side::Sell, 50));
        }
    }

    #[test]
    fn open_short_rows() {
        let short = Some(PositionHint::Short);
        assert_eq!(run(SignalAction::Open, short, false, dec!(0)).unwrap(), OrderIntent::no_action(Side::Sell));
        assert_eq!(run(SignalAction::Open, short, false, dec!(7)).unwrap(), OrderIntent::new(Side::Sell, 7));
        assert_eq!(run(SignalAction::Open, short, true, dec!(7)).unwrap(), OrderIntent::new(Side::Sell, 7));
        assert_eq!(run(SignalAction::Open, short, true, dec!(0)).unwrap(), OrderIntent::new(Side::Sell, 20));
        assert_eq!(run(SignalAction::Open, short, true, dec!(-3)).unwrap(), OrderIntent::no_action(Side::Sell));
        assert_eq!(run(SignalAction::Open, short, false, dec!(-3)).unwrap(), OrderIntent::no_action(Side::Sell));
    }

    #[test]
    fn close_short_rows() {
        let short = Some(PositionHint::Short);
        assert_eq!(run(SignalAction::Close, short, true, dec!(4)).unwrap(), OrderIntent::no_action(Side::Buy));
        assert_eq!(run(SignalAction::Close, short, true, dec!(0)).unwrap(), OrderIntent::no_action(Side::Buy));
        assert_eq!(run(SignalAction::Close, short, false, dec!(-12)).unwrap(), OrderIntent::new(Side::Buy, 12));
    }

    #[test]
    fn long_context_rows() {
        for hint in [None, Some(PositionHint::Long)] {
            for action in [SignalAction::Bull, SignalAction::Buy, SignalAction::Open] {
                assert_eq!(run(action, hint, false, dec!(0)).unwrap(), OrderIntent::new(Side::Buy, 20));
                assert_eq!(run(action, hint, false, dec!(3)).unwrap(), OrderIntent::no_action(Side::Buy));
                assert_eq!(run(action, hint, false, dec!(-3)).unwrap(), OrderIntent::no_action(Side::Buy));
            }
            for action in [SignalAction::Bear, SignalAction::Sell, SignalAction::Close] {
                assert_eq!(run(action, hint, false, dec!(3)).unwrap(), OrderIntent::new(Side::Sell, 3));
                assert_eq!(run(action, hint, false, dec!(0)).unwrap(), OrderIntent::no_action(Side::Sell));
                assert_eq!(run(action, hint, false, dec!(-3)).unwrap(), OrderIntent::no_action(Side::Sell));
            }
        }
    }

    #[test]
    fn short_hint_on_other_actions_is_unhandled() {
        for action in [SignalAction::Bull, SignalAction::Bear, SignalAction::Buy, SignalAction::Sell] {
            let err = run(action, Some(PositionHint::Short), true, dec!(0)).unwrap_err();
            assert!(matches!(err, TvbError::UnhandledSignal(_)));
        }
    }

    #[test]
    fn table_is_total_and_deterministic() {
        for action in ACTIONS {
            for hint in HINTS {
                for shorting in [false, true] {
                    for qty in [dec!(-5), dec!(0), dec!(5)] {
                        let first = run(action, hint, shorting, qty);
                        let second = run(action, hint, shorting, qty);
                        match (first, second) {
                            (Ok(a), Ok(b)) => assert_eq!(a, b),
                            (Err(TvbError::UnhandledSignal(_)), Err(TvbError::UnhandledSignal(_))) => {}
                            other => panic!("unexpected result for {action} {hint:?} {shorting} {qty}: {other:?}"),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn fractional_position_flattens_whole_part() {
        let intent = run(SignalAction::Sell, None, false, dec!(2.75)).unwrap();
        assert_eq!(intent, OrderIntent::new(Side::Sell, 2));
    }

    #[test]
    fn tiny_balance_gives_no_action() {
        let intent = decide(
            &signal(SignalAction::Buy, None, dec!(500)),
            &PositionState::flat(),
            &AccountState::new(dec!(100)),
            &opts(false),
        )
        .unwrap();
        assert!(intent.is_no_action());
    }

    #[test]
    fn unrepresentable_quantity_gives_no_action() {
        let tiny = crate::parser::parse_signal("order buy | X@0.0000000000000000000000001 | x").unwrap();
        let intent = decide(&tiny, &PositionState::flat(), &AccountState::new(dec!(100000)), &opts(false)).unwrap();
        assert!(intent.is_no_action());
    }

    #[test]
    fn options_follow_settings() {
        let options = TradingOptions {
            short: true,
            buy_perc: dec!(0.5),
            test_mode: true,
            enabled: false,
            limit: false,
            limit_amt: dec!(0),
            limit_threshold: dec!(0),
            limit_perc: dec!(0),
            max_time: 1.0,
            total_max_time: 2.0,
            buy_timeout: "Cancel".into(),
            sell_timeout: "Cancel".into(),
        };
        let sizing = SizingOptions::from_options(&options);
        assert!(sizing.shorting_enabled);
        assert_eq!(sizing.buy_fraction, dec!(0.5));
        assert_eq!(sizing.test_balance, Some(dec!(100000)));
    }
}
