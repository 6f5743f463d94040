use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use tezgah_core::Money;

use crate::normalize::normalize_numeric;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// A price with optional `.`-grouped thousands, allowed to carry non-digit
// markers on either side (`*70.40`, `70.40TL`). Applied after
// `normalize_numeric`, so `,` is already `.`.
re!(re_price_token, r"^[^\d]*(\d+(?:\.\d{3})*\.\d{2})[^\d]*$");

/// Parse one whitespace-delimited token as a price. Tokens that are not
/// price-shaped yield `None`.
pub fn parse_price(token: &str) -> Option<Money> {
    let normalized = normalize_numeric(token);
    let caps = re_price_token().captures(&normalized)?;
    let digits = caps.get(1)?.as_str();

    // Only the last `.` is the decimal point.
    let (whole, fraction) = digits.rsplit_once('.')?;
    let plain = format!("{}.{fraction}", whole.replace('.', ""));
    Decimal::from_str(&plain).ok().map(Money::from_decimal)
}

pub fn is_price_shaped(token: &str) -> bool {
    parse_price(token).is_some()
}

/// Digits and separators only, ignoring tax/marker punctuation (`%8`, `*2`).
pub fn is_numeric(token: &str) -> bool {
    let core = token.trim_matches(|c: char| matches!(c, '%' | '*' | '#'));
    !core.is_empty()
        && core.chars().any(|c| c.is_ascii_digit())
        && core.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// The right-most price on a line.
pub fn last_price(line: &str) -> Option<Money> {
    line.split_whitespace().rev().find_map(parse_price)
}
