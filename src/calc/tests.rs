#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn eval(s: &str) -> Decimal {
    evaluate(s, None).unwrap()
}

#[test]
fn test_precedence_and_parentheses() {
    assert_eq!(eval("1 + 2 * 3"), dec!(7));
    assert_eq!(eval("(1 + 2) * 3"), dec!(9));
    assert_eq!(eval("10 - 4 - 3"), dec!(3));
    assert_eq!(eval("100 / 10 / 5"), dec!(2));
    assert_eq!(eval("2 * (3 + (4 - 1)) / 4"), dec!(3));
}

#[test]
fn test_decimal_arithmetic_is_exact() {
    assert_eq!(eval("0.1 + 0.2"), dec!(0.3));
    assert_eq!(eval("19.99 * 3"), dec!(59.97));
    assert_eq!(eval("2.50 * 2").to_string(), "5");
}

#[test]
fn test_unary_minus() {
    assert_eq!(eval("-5 + 2"), dec!(-3));
    assert_eq!(eval("-(2 + 3)"), dec!(-5));
    assert_eq!(eval("4 * -2"), dec!(-8));
    assert_eq!(eval("--3"), dec!(3));
}

#[test]
fn test_percent_postfix() {
    assert_eq!(eval("50%"), dec!(0.5));
    assert_eq!(eval("200 * 15%"), dec!(30));
    assert_eq!(eval("(10 + 10)%"), dec!(0.2));
}

#[test]
fn test_money_formatting_tolerated() {
    assert_eq!(eval("$1,250.00 + $50"), dec!(1300));
    assert_eq!(eval("3 × 4 ÷ 2"), dec!(6));
}

#[test]
fn test_errors() {
    assert_eq!(evaluate("", None), Err(CalcError::Empty));
    assert_eq!(evaluate("   ", None), Err(CalcError::Empty));
    assert_eq!(evaluate("1 / 0", None), Err(CalcError::DivisionByZero));
    assert_eq!(evaluate("1 / (2 - 2)", None), Err(CalcError::DivisionByZero));
    assert_eq!(evaluate("(1 + 2", None), Err(CalcError::UnbalancedParens));
    assert_eq!(evaluate("1 + 2)", None), Err(CalcError::UnbalancedParens));
    assert_eq!(evaluate("1 +", None), Err(CalcError::UnexpectedEnd));
    assert!(matches!(
        evaluate("2 ^ 3", None),
        Err(CalcError::UnexpectedToken { pos: 2, .. })
    ));
    assert!(matches!(
        evaluate("pi * 2", None),
        Err(CalcError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        evaluate("1.2.3", None),
        Err(CalcError::InvalidNumber(_))
    ));
    assert!(matches!(
        evaluate("1 2", None),
        Err(CalcError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_overflow() {
    let big = Decimal::MAX.to_string();
    assert_eq!(
        evaluate(&format!("{big} * 10"), None),
        Err(CalcError::Overflow)
    );
}

#[test]
fn test_calculator_history_and_ans() {
    let mut calc = Calculator::new();
    assert_eq!(calc.eval("ans + 1"), Err(CalcError::NoPreviousResult));
    assert!(calc.history().is_empty());

    assert_eq!(calc.eval("12 * 3").unwrap(), dec!(36));
    assert_eq!(calc.eval("ans / 4").unwrap(), dec!(9));
    assert_eq!(calc.eval("ANS % ").unwrap(), dec!(0.09));
    assert!(calc.eval("1 / 0").is_err());

    assert_eq!(calc.history().len(), 3);
    assert_eq!(calc.history()[1].0, "ans / 4");
    assert_eq!(calc.ans(), Some(dec!(0.09)));

    calc.clear();
    assert!(calc.ans().is_none());
}

#[test]
fn test_parse_amount_keeps_typed_scale() {
    assert_eq!(parse_amount("12.50").unwrap().to_string(), "12.50");
    assert_eq!(parse_amount("-3.10").unwrap().to_string(), "-3.10");
    assert_eq!(parse_amount("1.25+2.25").unwrap().to_string(), "3.50");
    // the calculator display still trims
    assert_eq!(evaluate("12.50", None).unwrap().to_string(), "12.5");
}

#[test]
fn test_parse_amount_accepts_expressions() {
    assert_eq!(parse_amount("12.50"), Some(dec!(12.50)));
    assert_eq!(parse_amount("$1,200"), Some(dec!(1200)));
    assert_eq!(parse_amount("12.50+3.25"), Some(dec!(15.75)));
    assert_eq!(parse_amount("-4"), Some(dec!(-4)));
    assert_eq!(parse_amount("lunch"), None);
    assert_eq!(parse_amount(""), None);
}
