//! Exact rational amounts and the small arithmetic-expression grammar used to
//! parse them (`+ - * ( )` over decimal literals, never `/`: that code point
//! is reserved for the synthetic inventory unit).

use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use pest::Parser;
use pest::iterators::Pairs;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::error::{Kind, LedgerError};

#[derive(Parser)]
#[grammar = "./src/grammar.pest"]
struct AmountParser;

/// An exact rational amount. All arithmetic is exact; decimal formatting is
/// purely a presentation concern applied at render time.
pub type Amount = BigRational;

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::subtract, Assoc::Left))
            .op(Op::infix(Rule::multiply, Assoc::Left))
    })
}

/// Parses a decimal literal such as `12.340` into an exact `BigRational`
/// (always a power-of-ten fraction, never a lossy `f64` round-trip).
fn parse_decimal(text: &str) -> BigRational {
    match text.split_once('.') {
        Some((whole, frac)) => {
            let digits = format!("{whole}{frac}");
            let numer = BigInt::from_str(&digits).unwrap_or_else(|_| BigInt::zero());
            let denom = BigInt::from(10u32).pow(frac.len() as u32);
            BigRational::new(numer, denom)
        }
        None => {
            let numer = BigInt::from_str(text).unwrap_or_else(|_| BigInt::zero());
            BigRational::new(numer, BigInt::from(1))
        }
    }
}

fn eval(pairs: Pairs<'_, Rule>) -> BigRational {
    pratt()
        .map_primary(|primary| match primary.as_rule() {
            Rule::num => parse_decimal(primary.as_str()),
            Rule::neg => -eval(primary.into_inner()),
            Rule::expr => eval(primary.into_inner()),
            other => unreachable!("unexpected primary rule {other:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::add => lhs + rhs,
            Rule::subtract => lhs - rhs,
            Rule::multiply => lhs * rhs,
            other => unreachable!("unexpected infix rule {other:?}"),
        })
        .parse(pairs)
}

/// Parses an amount expression (a numeric literal, optionally combined with
/// `+ - * ( )`) into an exact rational.
pub fn parse_amount(expr: &str) -> Result<Amount, LedgerError> {
    let mut pairs = AmountParser::parse(Rule::amount_expr, expr.trim()).map_err(|e| {
        LedgerError::with_source(Kind::ParseAmount, format!("expression `{expr}`"), e)
    })?;
    let amount_expr = pairs.next().expect("amount_expr always present on success");
    let mut inner = amount_expr.into_inner();
    let expr_pair = inner
        .next()
        .filter(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| LedgerError::new(Kind::ParseAmount, format!("expression `{expr}`")))?;
    Ok(eval(expr_pair.into_inner()))
}

/// Sign of a rational: `1`, `0`, or `-1`.
pub fn sign_of(r: &Amount) -> i32 {
    if r.is_positive() {
        1
    } else if r.is_negative() {
        -1
    } else {
        0
    }
}

/// Formats an amount to a fixed number of fractional digits (truncating
/// towards zero), the way the renderer prints balances.
pub fn format_fixed(r: &Amount, digits: u32) -> String {
    let neg = r.is_negative();
    let r = r.abs();
    let scale = BigInt::from(10u32).pow(digits);
    let scaled = (r * BigRational::from_integer(scale.clone())).to_integer();
    let scaled_str = scaled.to_string();
    let padded = if scaled_str.len() <= digits as usize {
        format!("{:0>width$}", scaled_str, width = digits as usize + 1)
    } else {
        scaled_str
    };
    let split_at = padded.len() - digits as usize;
    let (whole, frac) = padded.split_at(split_at);
    let body = if digits == 0 {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    };
    if neg && body.chars().any(|c| c != '0' && c != '.') {
        format!("-{body}")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::ToPrimitive;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plain_decimal() {
        let a = parse_amount("12.34").unwrap();
        assert_eq!(a, BigRational::new(BigInt::from(1234), BigInt::from(100)));
    }

    #[test]
    fn parses_expression_with_precedence() {
        let a = parse_amount("2 + 3 * 4").unwrap();
        assert_eq!(a.to_f64().unwrap(), 14.0);
    }

    #[test]
    fn parses_parens_and_unary_minus() {
        let a = parse_amount("-(2 + 3) * 2").unwrap();
        assert_eq!(a.to_f64().unwrap(), -10.0);
    }

    #[test]
    fn rejects_division_operator() {
        assert!(parse_amount("10 / 2").is_err());
    }

    #[test]
    fn formats_two_decimals() {
        let a = parse_amount("1").unwrap() / BigRational::from_integer(BigInt::from(3));
        assert_eq!(format_fixed(&a, 2), "0.33");
    }

    #[test]
    fn round_trips_through_formatting() {
        let original = parse_amount("7.250").unwrap();
        let formatted = format_fixed(&original, 3);
        let reparsed = parse_amount(&formatted).unwrap();
        assert_eq!(original, reparsed);
    }
}
