//! `!#if` condition evaluation
//!
//! Conditions are boolean expressions over the literals `true`/`false`,
//! platform identifiers, `!`, `&&`, `||`, and parentheses. A platform
//! identifier substitutes to `true` only when it equals the configured
//! target platform. Anything outside that grammar, or any parse failure,
//! evaluates to `false` (fail-closed). An empty condition is `true`.

use log::debug;

/// Evaluate a directive condition against the target platform.
pub fn evaluate(expr: &str, target_platform: Option<&str>) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return true;
    }

    let tokens = match tokenize(expr, target_platform) {
        Some(tokens) => tokens,
        None => {
            debug!("condition '{expr}' is outside the allowed grammar, evaluating to false");
            return false;
        }
    };

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    match parser.parse_or() {
        Some(value) if parser.pos == tokens.len() => value,
        _ => {
            debug!("condition '{expr}' failed to parse, evaluating to false");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(bool),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(expr: &str, target_platform: Option<&str>) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b'!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            b'&' => {
                if bytes.get(i + 1) != Some(&b'&') {
                    return None;
                }
                tokens.push(Token::And);
                i += 2;
            }
            b'|' => {
                if bytes.get(i + 1) != Some(&b'|') {
                    return None;
                }
                tokens.push(Token::Or);
                i += 2;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let word = &expr[start..i];
                let value = match word {
                    "true" => true,
                    "false" => false,
                    // Platform identifiers substitute to true only when
                    // they name the targeted platform.
                    _ => Some(word) == target_platform,
                };
                tokens.push(Token::Literal(value));
            }
            _ => return None,
        }
    }

    Some(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn parse_or(&mut self) -> Option<bool> {
        let mut value = self.parse_and()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn parse_and(&mut self) -> Option<bool> {
        let mut value = self.parse_unary()?;
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn parse_unary(&mut self) -> Option<bool> {
        match self.peek()? {
            Token::Not => {
                self.pos += 1;
                Some(!self.parse_unary()?)
            }
            Token::Open => {
                self.pos += 1;
                let value = self.parse_or()?;
                if self.peek()? != Token::Close {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            Token::Literal(value) => {
                self.pos += 1;
                Some(value)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert!(evaluate("true", None));
        assert!(!evaluate("false", None));
        assert!(evaluate("", None));
        assert!(evaluate("   ", None));
    }

    #[test]
    fn test_operators() {
        assert!(evaluate("!false", None));
        assert!(evaluate("true && true", None));
        assert!(!evaluate("true && false", None));
        assert!(evaluate("false || true", None));
        assert!(evaluate("(true || false) && !(false)", None));
    }

    #[test]
    fn test_precedence() {
        // && binds tighter than ||
        assert!(evaluate("true || false && false", None));
        assert!(!evaluate("(true || false) && false", None));
    }

    #[test]
    fn test_platform_substitution() {
        assert!(!evaluate("adguard_app_windows", None));
        assert!(evaluate("adguard_app_windows", Some("adguard_app_windows")));
        assert!(!evaluate("adguard_app_windows", Some("adguard_app_mac")));
        assert!(evaluate("!adguard_app_windows", Some("adguard_app_mac")));
        assert!(evaluate(
            "adguard_app_mac || adguard_app_windows",
            Some("adguard_app_mac")
        ));
    }

    #[test]
    fn test_fail_closed() {
        assert!(!evaluate("true &", None));
        assert!(!evaluate("true | false", None));
        assert!(!evaluate("(true", None));
        assert!(!evaluate("true)", None));
        assert!(!evaluate("true; false", None));
        assert!(!evaluate("true true", None));
        assert!(!evaluate("&&", None));
    }
}
