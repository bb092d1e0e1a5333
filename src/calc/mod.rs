//! Decimal calculator used by the Calculator screen and `junkyard calc`.

use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum CalcError {
    #[error("nothing to calculate")]
    Empty,
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("expression ends too early")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("number too large")]
    Overflow,
    #[error("no previous result for 'ans'")]
    NoPreviousResult,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ans,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            ' ' | '\t' | ',' | '$' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == ',') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().filter(|c| **c != ',').collect();
                let value = Decimal::from_str(&raw).map_err(|_| CalcError::InvalidNumber(raw.clone()))?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word.eq_ignore_ascii_case("ans") {
                    tokens.push((Token::Ans, start));
                    continue;
                }
                return Err(CalcError::UnexpectedToken { found: word, pos: start });
            }
            other => {
                return Err(CalcError::UnexpectedToken {
                    found: other.to_string(),
                    pos: i,
                })
            }
        };
        tokens.push((token, i));
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    ans: Option<Decimal>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expression(&mut self) -> Result<Decimal, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = value.checked_add(self.term()?).ok_or(CalcError::Overflow)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = value.checked_sub(self.term()?).ok_or(CalcError::Overflow)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Decimal, CalcError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = value.checked_mul(self.unary()?).ok_or(CalcError::Overflow)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs.is_zero() {
                        return Err(CalcError::DivisionByZero);
                    }
                    value = value.checked_div(rhs).ok_or(CalcError::Overflow)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<Decimal, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.postfix(),
        }
    }

    /// `50%` is `0.5`.
    fn postfix(&mut self) -> Result<Decimal, CalcError> {
        let mut value = self.primary()?;
        while let Some(Token::Percent) = self.peek() {
            self.pos += 1;
            value = value
                .checked_div(Decimal::ONE_HUNDRED)
                .ok_or(CalcError::Overflow)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<Decimal, CalcError> {
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(n),
            Some((Token::Ans, _)) => self.ans.ok_or(CalcError::NoPreviousResult),
            Some((Token::LParen, _)) => {
                let value = self.expression()?;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(value),
                    Some(_) | None => Err(CalcError::UnbalancedParens),
                }
            }
            Some((Token::RParen, _)) => Err(CalcError::UnbalancedParens),
            Some((tok, pos)) => Err(CalcError::UnexpectedToken {
                found: token_text(&tok),
                pos,
            }),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn token_text(token: &Token) -> String {
    match token {
        Token::Number(n) => n.to_string(),
        Token::Ans => "ans".into(),
        Token::Plus => "+".into(),
        Token::Minus => "-".into(),
        Token::Star => "*".into(),
        Token::Slash => "/".into(),
        Token::Percent => "%".into(),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
    }
}

/// Evaluate `input`. `ans` refers to `previous`. The result is normalized
/// for display, so `2.50 * 2` is `5`.
pub(crate) fn evaluate(input: &str, previous: Option<Decimal>) -> Result<Decimal, CalcError> {
    evaluate_exact(input, previous).map(|v| v.normalize())
}

/// Evaluate keeping the scale the arithmetic produced.
fn evaluate_exact(input: &str, previous: Option<Decimal>) -> Result<Decimal, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        ans: previous,
    };
    let value = parser.expression()?;
    if let Some((tok, pos)) = parser.advance() {
        return Err(match tok {
            Token::RParen => CalcError::UnbalancedParens,
            other => CalcError::UnexpectedToken {
                found: token_text(&other),
                pos,
            },
        });
    }
    Ok(value)
}

/// Read an amount typed by the user. Expressions are accepted, so
/// `12.50+3.25` is `15.75`. The typed scale is kept: `12.50` stays `12.50`.
pub(crate) fn parse_amount(input: &str) -> Option<Decimal> {
    evaluate_exact(input, None).ok()
}

/// Evaluator with a running history.
#[derive(Debug, Default)]
pub(crate) struct Calculator {
    history: Vec<(String, Decimal)>,
}

impl Calculator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ans(&self) -> Option<Decimal> {
        self.history.last().map(|(_, v)| *v)
    }

    /// Evaluate and record. Failed expressions are not recorded.
    pub(crate) fn eval(&mut self, input: &str) -> Result<Decimal, CalcError> {
        let value = evaluate(input, self.ans())?;
        self.history.push((input.trim().to_string(), value));
        Ok(value)
    }

    pub(crate) fn history(&self) -> &[(String, Decimal)] {
        &self.history
    }

    pub(crate) fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests;
