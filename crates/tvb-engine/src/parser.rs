//! Alert text parser.
//!
//! Two grammars are recognized, selected by prefix:
//!
//! | Prefix    | Grammar   | Shape                                                   |
//! |-----------|-----------|---------------------------------------------------------|
//! | `LDC`     | indicator | `… (bear\|bull\|open\|close)? (long\|short)? … \| SYM@PRICE \|` |
//! | any other | strategy  | `order (buy\|sell) \| SYM@PRICE \|`                      |
//!
//! Keyword matching is case-insensitive and the search is unanchored. A match
//! never spans a line break. The price may be wrapped in square brackets
//! (`TSLA@[251.3]`). The symbol is returned exactly as written.
//!
//! When several split points are possible, the rightmost `| ` and then the
//! rightmost `@` win, so `A | B | SYM@1 |` yields `SYM`.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::debug;
use tvb_core::TvbError;
use tvb_core::types::{PositionHint, SignalAction, TradeSignal};

/// Prefix that selects the indicator grammar. Case-sensitive.
const INDICATOR_PREFIX: &str = "LDC";

const INDICATOR_ACTIONS: [&str; 4] = ["bear", "bull", "open", "close"];
const HINTS: [&str; 2] = ["long", "short"];
const STRATEGY_SIDES: [&str; 2] = ["buy", "sell"];

/// Captures of a successful match, borrowed from the alert text.
#[derive(Debug, PartialEq, Eq)]
struct Captures<'a> {
    action: &'a str,
    hint: Option<&'a str>,
    symbol: &'a str,
    price: &'a str,
}

/// Parse an alert into a [`TradeSignal`].
pub fn parse_signal(raw: &str) -> Result<TradeSignal, TvbError> {
    let captures = if raw.starts_with(INDICATOR_PREFIX) {
        raw.split('\n').find_map(match_indicator)
    } else {
        raw.split('\n').find_map(match_strategy)
    };
    let Some(captures) = captures else {
        return Err(TvbError::Parse(format!("unrecognized alert: {raw:?}")));
    };

    let action = SignalAction::from_keyword(captures.action)
        .ok_or_else(|| TvbError::Parse(format!("unknown action '{}'", captures.action)))?;
    let position_hint = match captures.hint {
        Some(word) => Some(
            PositionHint::from_keyword(word).ok_or_else(|| TvbError::Parse(format!("unknown position hint '{word}'")))?,
        ),
        None => None,
    };
    let reference_price = parse_price(captures.price)?;

    let signal = TradeSignal { action, position_hint, symbol: captures.symbol.to_string(), reference_price };
    debug!("[parser] {raw:?} → {signal}");
    Ok(signal)
}

fn parse_price(text: &str) -> Result<Decimal, TvbError> {
    let price = Decimal::from_str(text).map_err(|e| TvbError::Parse(format!("invalid price '{text}': {e}")))?;
    if price <= Decimal::ZERO {
        return Err(TvbError::Parse(format!("price must be positive, got '{text}'")));
    }
    Ok(price)
}

// ---------------------------------------------------------------------------
// Grammars
// ---------------------------------------------------------------------------

/// Indicator grammar: leftmost action keyword, at least one character, an
/// optional hint, then the `| SYM@PRICE |` tail.
fn match_indicator(line: &str) -> Option<Captures<'_>> {
    // ASCII lowercasing keeps byte offsets valid for `line`.
    let lower = line.to_ascii_lowercase();

    for (start, _) in lower.char_indices() {
        let Some(keyword) = INDICATOR_ACTIONS.iter().find(|kw| lower[start..].starts_with(*kw)) else {
            continue;
        };
        let keyword_end = start + keyword.len();
        let Some(gap) = line[keyword_end..].chars().next() else {
            continue;
        };
        let hint_start = keyword_end + gap.len_utf8();

        if let Some(hint) = HINTS.iter().find(|h| lower[hint_start..].starts_with(*h)) {
            let hint_end = hint_start + hint.len();
            if let Some((symbol, price)) = match_tail(&line[hint_end..]) {
                return Some(Captures {
                    action: &line[start..keyword_end],
                    hint: Some(&line[hint_start..hint_end]),
                    symbol,
                    price,
                });
            }
        }
        if let Some((symbol, price)) = match_tail(&line[hint_start..]) {
            return Some(Captures { action: &line[start..keyword_end], hint: None, symbol, price });
        }
    }
    None
}

/// Strategy grammar: `order buy | ` or `order sell | ` followed by the quote.
fn match_strategy(line: &str) -> Option<Captures<'_>> {
    let lower = line.to_ascii_lowercase();

    for (start, prefix) in lower.match_indices("order ") {
        let side_start = start + prefix.len();
        let Some(side) = STRATEGY_SIDES.iter().find(|s| lower[side_start..].starts_with(*s)) else {
            continue;
        };
        let side_end = side_start + side.len();
        let Some(quote) = line[side_end..].strip_prefix(" | ") else {
            continue;
        };
        if let Some((symbol, price)) = match_quote(quote) {
            return Some(Captures { action: &line[side_start..side_end], hint: None, symbol, price });
        }
    }
    None
}

/// `<anything, non-empty>| SYM@PRICE |`, rightmost `| ` first.
fn match_tail(text: &str) -> Option<(&str, &str)> {
    text.rmatch_indices("| ")
        .filter(|(at, _)| *at >= 1)
        .find_map(|(at, sep)| match_quote(&text[at + sep.len()..]))
}

/// `SYM@PRICE |`, rightmost `@` first. The symbol is non-empty.
fn match_quote(text: &str) -> Option<(&str, &str)> {
    text.rmatch_indices('@')
        .filter(|(at, _)| *at >= 1)
        .find_map(|(at, _)| match_price(&text[at + 1..]).map(|price| (&text[..at], price)))
}

/// `[*digits-and-dots]* |`; returns the digits-and-dots run.
fn match_price(text: &str) -> Option<&str> {
    let rest = text.trim_start_matches('[');
    let len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let (price, after) = rest.split_at(len);
    after.trim_start_matches(']').starts_with(" |").then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn strategy_alert() {
        let s = parse_signal("order buy | MSFT@337.57 | Directional Movement Index").unwrap();
        assert_eq!(s.action, SignalAction::Buy);
        assert_eq!(s.position_hint, None);
        assert_eq!(s.symbol, "MSFT");
        assert_eq!(s.reference_price, dec!(337.57));
    }

    #[test]
    fn strategy_alert_is_case_insensitive() {
        let s = parse_signal("ORDER SELL | aapl@[189.2] | x").unwrap();
        assert_eq!(s.action, SignalAction::Sell);
        assert_eq!(s.symbol, "aapl");
        assert_eq!(s.reference_price, dec!(189.2));
    }

    #[test]
    fn strategy_alert_after_preamble() {
        let s = parse_signal("Strategy X: order sell | BTC/USD@43000.5 | filled").unwrap();
        assert_eq!(s.action, SignalAction::Sell);
        assert_eq!(s.symbol, "BTC/USD");
        assert_eq!(s.reference_price, dec!(43000.5));
    }

    #[test]
    fn indicator_alert_without_hint() {
        let s = parse_signal("LDC Kernel Bullish ▲ | CLSK@4.015 | (1)").unwrap();
        assert_eq!(s.action, SignalAction::Bull);
        assert_eq!(s.position_hint, None);
        assert_eq!(s.symbol, "CLSK");
        assert_eq!(s.reference_price, dec!(4.015));
    }

    #[test]
    fn indicator_alert_with_hint_and_brackets() {
        let s = parse_signal("LDC Open Short ▼ | TSLA@[251.3] | (2)").unwrap();
        assert_eq!(s.action, SignalAction::Open);
        assert_eq!(s.position_hint, Some(PositionHint::Short));
        assert_eq!(s.symbol, "TSLA");
        assert_eq!(s.reference_price, dec!(251.3));
    }

    #[test]
    fn indicator_close_long() {
        let s = parse_signal("LDC Close Long ▼ | MSFT@[338.1] | (3)").unwrap();
        assert_eq!(s.action, SignalAction::Close);
        assert_eq!(s.position_hint, Some(PositionHint::Long));
    }

    #[test]
    fn indicator_bearish_kernel() {
        let s = parse_signal("LDC Kernel Bearish ▼ | SPY@450 | (1)").unwrap();
        assert_eq!(s.action, SignalAction::Bear);
        assert_eq!(s.position_hint, None);
        assert_eq!(s.reference_price, dec!(450));
    }

    #[test]
    fn rightmost_separator_wins() {
        let m = match_tail(" x | A | MSFT@1.5 | y").unwrap();
        assert_eq!(m, ("MSFT", "1.5"));
    }

    #[test]
    fn prefix_selects_grammar() {
        // An indicator-style body without the prefix is not a strategy alert.
        assert!(matches!(parse_signal("Kernel Bullish | CLSK@4.015 | (1)"), Err(TvbError::Parse(_))));
        // The prefix is case-sensitive.
        assert!(parse_signal("ldc Open Short ▼ | TSLA@[251.3] | (2)").is_err());
    }

    #[test]
    fn missing_trailing_pipe_is_rejected() {
        assert!(parse_signal("order buy | MSFT@337.57").is_err());
    }

    #[test]
    fn invalid_prices_are_rejected() {
        assert!(matches!(parse_signal("order buy | MSFT@1.2.3 | x"), Err(TvbError::Parse(_))));
        assert!(matches!(parse_signal("order buy | MSFT@0 | x"), Err(TvbError::Parse(_))));
        assert!(parse_signal("order buy | MSFT@abc | x").is_err());
    }

    #[test]
    fn match_does_not_span_lines() {
        assert!(parse_signal("order buy | MSFT@\n337.57 | x").is_err());
        let s = parse_signal("heartbeat\norder buy | MSFT@337.57 | x").unwrap();
        assert_eq!(s.symbol, "MSFT");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_signal(""), Err(TvbError::Parse(_))));
        assert!(matches!(parse_signal("hello world"), Err(TvbError::Parse(_))));
    }
}
