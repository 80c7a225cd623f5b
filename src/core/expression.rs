//! Restricted arithmetic evaluator for the custom acronyms of workload commands.
//!
//! Only numeric literals, `+ - * /`, unary minus and parentheses are understood, so a scenario
//! document can compute values from the built-in macros but never run anything else.

use nom::IResult;

use crate::error::{GeneratorError, Result};

/// Evaluates `expression` to a finite number.
///
/// # Examples
///
/// ```rust
/// use cloudfactory::core::expression::evaluate;
///
/// assert_eq!(evaluate("3600 / (2 + 2)").unwrap(), 900.0);
/// assert!(evaluate("__import__('os')").is_err());
/// ```
pub fn evaluate(expression: &str) -> Result<f64> {
    let value = parse(expression)?;
    if !value.is_finite() {
        return Err(GeneratorError::InvalidExpression {
            expression: expression.to_string(),
            reason: "result is not a finite number".to_string(),
        });
    }
    Ok(value)
}

/// Checks that `expression` is well formed, whatever it evaluates to.
pub fn check_syntax(expression: &str) -> Result<()> {
    parse(expression).map(|_| ())
}

/// Formats an evaluated value, integral values without a fractional part.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // also catches -0
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

fn parse(expression: &str) -> Result<f64> {
    use nom::combinator::all_consuming;
    all_consuming(sum)(expression)
        .map(|(_, value)| value)
        .map_err(|err| GeneratorError::InvalidExpression {
            expression: expression.to_string(),
            reason: err.to_string(),
        })
}

fn sum(s: &str) -> IResult<&str, f64> {
    use nom::{character::complete::one_of, multi::fold_many0, sequence::pair};
    let (s, first) = product(s)?;
    fold_many0(
        pair(spaced(one_of("+-")), product),
        move || first,
        |acc, (op, value)| if op == '+' { acc + value } else { acc - value },
    )(s)
}

fn product(s: &str) -> IResult<&str, f64> {
    use nom::{character::complete::one_of, multi::fold_many0, sequence::pair};
    let (s, first) = factor(s)?;
    fold_many0(
        pair(spaced(one_of("*/")), factor),
        move || first,
        |acc, (op, value)| if op == '*' { acc * value } else { acc / value },
    )(s)
}

fn factor(s: &str) -> IResult<&str, f64> {
    use nom::{
        branch::alt,
        character::complete::char,
        combinator::map,
        sequence::{delimited, preceded},
    };
    alt((
        map(preceded(spaced(char('-')), factor), |value| -value),
        delimited(spaced(char('(')), sum, spaced(char(')'))),
        spaced(literal),
    ))(s)
}

/// Plain decimal literal: `12`, `1.75`, `.5`. No sign, exponent or special values.
fn literal(s: &str) -> IResult<&str, f64> {
    use nom::{
        branch::alt,
        character::complete::{char, digit0, digit1},
        combinator::{map_res, opt, recognize},
        sequence::{pair, preceded},
    };
    map_res(
        recognize(alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(preceded(char('.'), digit1)),
        ))),
        str::parse::<f64>,
    )(s)
}

fn spaced<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    use nom::{character::complete::multispace0, sequence::delimited};
    delimited(multispace0, inner, multispace0)
}
