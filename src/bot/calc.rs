//! Arithmetic evaluation for `/calc` and the inline `calc` keyword.
//!
//! Input is first reduced to digits, `+ - * / ( )`; everything else is
//! dropped. The remainder is parsed by a small recursive-descent parser:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```

use std::fmt;

/// Nesting limit for parentheses and unary signs.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Nothing left after filtering.
    Empty,
    /// Unexpected token at the given position of the filtered expression.
    Syntax(usize),
    DivisionByZero,
    /// Result overflowed to infinity or NaN.
    NotFinite,
    TooDeep,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::Syntax(pos) => write!(f, "syntax error at position {pos}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::NotFinite => write!(f, "result is not finite"),
            Self::TooDeep => write!(f, "expression nested too deeply"),
        }
    }
}

impl std::error::Error for CalcError {}

/// Drop every character outside the allowed arithmetic set.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')'))
        .collect()
}

/// Sanitize and evaluate.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let expr = sanitize(input);
    if expr.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser { bytes: expr.as_bytes(), pos: 0, depth: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.bytes.len() {
        return Err(CalcError::Syntax(parser.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Render a result the way the bot replies with it.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // -0 prints as 0
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.10}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == b'+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        let value = match self.peek() {
            Some(b'+') => {
                self.pos += 1;
                self.factor()?
            }
            Some(b'-') => {
                self.pos += 1;
                -self.factor()?
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(CalcError::Syntax(self.pos));
                }
                self.pos += 1;
                inner
            }
            Some(b) if b.is_ascii_digit() => self.number(),
            _ => return Err(CalcError::Syntax(self.pos)),
        };
        self.depth -= 1;
        Ok(value)
    }

    fn number(&mut self) -> f64 {
        let mut value = 0.0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value * 10.0 + f64::from(b - b'0');
            self.pos += 1;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_addition() {
        assert_eq!(evaluate("2+2"), Ok(4.0));
        assert_eq!(format_number(evaluate("2+2").unwrap()), "4");
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10-4-3"), Ok(3.0));
        assert_eq!(evaluate("100/10/5"), Ok(2.0));
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(evaluate("-3+5"), Ok(2.0));
        assert_eq!(evaluate("2*-3"), Ok(-6.0));
        assert_eq!(evaluate("--4"), Ok(4.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("10/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_letters_are_stripped_before_evaluation() {
        assert_eq!(sanitize("DROP TABLE users; 2+2"), "2+2");
        assert_eq!(evaluate("DROP TABLE"), Err(CalcError::Empty));
        // "2 plus 2 is 2+2" keeps only "222+2"
        assert_eq!(evaluate("2 plus 2 is 2+2"), Ok(224.0));
        assert_eq!(evaluate("what is 6 * 7?"), Ok(42.0));
    }

    #[test]
    fn test_code_is_not_executed() {
        assert_eq!(sanitize("__import__('os').system('ls')"), "()()");
        assert!(evaluate("__import__('os').system('ls')").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(evaluate("2+"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("(2+3"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("2+3)"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("*2"), Err(CalcError::Syntax(_))));
        assert_eq!(evaluate(""), Err(CalcError::Empty));
    }

    #[test]
    fn test_decimal_point_is_dropped() {
        // '.' is outside the allowed set, so 2.5 reads as 25
        assert_eq!(evaluate("2.5*2"), Ok(50.0));
    }

    #[test]
    fn test_non_finite() {
        let huge = "9".repeat(400);
        assert_eq!(evaluate(&huge), Err(CalcError::NotFinite));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate(&deep), Err(CalcError::TooDeep));
        let unary = format!("{}1", "-".repeat(200));
        assert_eq!(evaluate(&unary), Err(CalcError::TooDeep));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(10.0 / 4.0), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
    }
}
