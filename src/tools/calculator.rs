//! Calculator tool
//!
//! Plain arithmetic is evaluated locally so that `2+2` never depends on a
//! model. Anything the local evaluator cannot parse (equations, word
//! problems) is delegated to a single model call.

use super::{Sentinels, ToolExecutor, ToolResult, CALCULATOR_TOOL};
use crate::error::Result;
use crate::prompts::calculator_prompt;
use crate::providers::{complete_text, Provider};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Sentinels rendered for failed calculations
pub const CALCULATOR_SENTINELS: Sentinels = Sentinels {
    no_information:
        "The numbers became momentarily clouded; the calculation could not be completed as expected.",
    error: "My abacus seems to be malfunctioning; I could not perform the calculation.",
};

/// Reply given when an expression divides by zero
pub const DIVISION_BY_ZERO_REPLY: &str =
    "Division by zero is undefined, so this expression has no numeric answer.";

/// Why local evaluation stopped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The input is not a plain arithmetic expression
    #[error("not an arithmetic expression: {0}")]
    Unsupported(String),
    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,
    /// The result is not a finite real number
    #[error("result is not a finite number")]
    NotFinite,
}

#[derive(Debug, Deserialize)]
struct CalculateArgs {
    expression: String,
}

/// Calculator tool with local evaluation and a model fallback
pub struct CalculatorTool {
    provider: Arc<dyn Provider>,
}

impl CalculatorTool {
    /// Create a calculator that falls back to the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Calculate an expression or answer a math question
    pub async fn calculate(&self, expression: &str) -> ToolResult {
        let expression = expression.trim();
        if expression.is_empty() {
            return ToolResult::no_information();
        }

        match evaluate(expression) {
            Ok(value) => {
                tracing::debug!("Evaluated locally: {} = {}", expression, value);
                return ToolResult::found(format_number(value));
            }
            Err(EvalError::DivisionByZero) => {
                return ToolResult::found(DIVISION_BY_ZERO_REPLY);
            }
            Err(e) => tracing::debug!("Delegating calculation to model: {}", e),
        }

        match complete_text(self.provider.as_ref(), None, &calculator_prompt(expression)).await {
            Ok(Some(answer)) => ToolResult::found(answer),
            Ok(None) => ToolResult::no_information(),
            Err(e) => {
                tracing::warn!("Calculation failed: {}", e);
                ToolResult::error(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for CalculatorTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": CALCULATOR_TOOL,
            "description": "Evaluates a mathematical expression or answers a math question: arithmetic, percentages, square roots, equations.",
            "parameters": {
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The expression or question, e.g. \"15 + 7\", \"what is the square root of 256?\", \"solve 2x + 5 = 11 for x\"."
                    }
                },
                "required": ["expression"]
            }
        })
    }

    fn sentinels(&self) -> &'static Sentinels {
        &CALCULATOR_SENTINELS
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let args: CalculateArgs = serde_json::from_value(args)?;
        Ok(self.calculate(&args.expression).await)
    }
}

/// Evaluate a plain arithmetic expression
///
/// Accepts numbers, `+ - * / % ^`, parentheses, unary minus, `sqrt(...)`,
/// "N% of M", "square root of N", a leading "what is"/"calculate" and a
/// trailing question mark.
///
/// # Errors
///
/// Returns `EvalError::Unsupported` for anything else
///
/// # Examples
///
/// ```
/// use aizen::tools::calculator::evaluate;
///
/// assert_eq!(evaluate("2+2").unwrap(), 4.0);
/// assert_eq!(evaluate("What is 15% of 200?").unwrap(), 30.0);
/// assert!(evaluate("solve 2x = 4").is_err());
/// ```
pub fn evaluate(input: &str) -> std::result::Result<f64, EvalError> {
    let normalized = normalize(input);
    let mut parser = Parser::new(&normalized)?;
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Unsupported(input.to_string()));
    }
    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

/// Format a result without float noise
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{:.10}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

static LEAD_IN: OnceLock<Option<Regex>> = OnceLock::new();
static PERCENT_OF: OnceLock<Option<Regex>> = OnceLock::new();
static SQUARE_ROOT_OF: OnceLock<Option<Regex>> = OnceLock::new();

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn normalize(input: &str) -> String {
    let mut text = input
        .trim()
        .to_lowercase()
        .replace('×', "*")
        .replace('÷', "/");
    text = text
        .trim_end_matches(|c: char| c == '?' || c == '.' || c == '=' || c.is_whitespace())
        .to_string();

    if let Some(re) = cached(
        &LEAD_IN,
        r"^(?:what\s+is|what's|whats|calculate|compute|evaluate)\s+(?:the\s+)?",
    ) {
        text = re.replace(&text, "").to_string();
    }
    if let Some(caps) = cached(
        &PERCENT_OF,
        r"^([0-9]*\.?[0-9]+)\s*(?:%|percent)\s+of\s+(.+)$",
    )
    .and_then(|re| re.captures(&text))
    {
        return format!("({})*({})/100", &caps[1], &caps[2]);
    }
    if let Some(caps) =
        cached(&SQUARE_ROOT_OF, r"^square\s+root\s+of\s+(.+)$").and_then(|re| re.captures(&text))
    {
        return format!("sqrt({})", &caps[1]);
    }
    text
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    LParen,
    RParen,
    Sqrt,
}

/// Deepest nesting of parentheses, `sqrt`, signs and exponents accepted
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> std::result::Result<Self, EvalError> {
        let unsupported = || EvalError::Unsupported(text.to_string());
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                ' ' | '\t' => i += 1,
                '0'..='9' | '.' => {
                    let start = i;
                    while i < chars.len()
                        && (chars[i].is_ascii_digit()
                            || chars[i] == '.'
                            || (chars[i] == ',' && is_thousands_separator(&chars, i)))
                    {
                        i += 1;
                    }
                    let literal: String = chars[start..i].iter().filter(|c| **c != ',').collect();
                    let value = literal.parse::<f64>().map_err(|_| unsupported())?;
                    tokens.push(Token::Number(value));
                }
                '+' | '-' | '*' | '/' | '%' | '^' => {
                    tokens.push(Token::Op(c));
                    i += 1;
                }
                '(' => {
                    tokens.push(Token::LParen);
                    i += 1;
                }
                ')' => {
                    tokens.push(Token::RParen);
                    i += 1;
                }
                _ if chars[i..].starts_with(&['s', 'q', 'r', 't']) => {
                    tokens.push(Token::Sqrt);
                    i += 4;
                }
                _ => return Err(unsupported()),
            }
        }

        if tokens.is_empty() {
            return Err(unsupported());
        }
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn unsupported(&self) -> EvalError {
        EvalError::Unsupported(format!("unexpected token at position {}", self.pos))
    }

    /// Run `rule` one level deeper, refusing past `MAX_NESTING`
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> std::result::Result<f64, EvalError>,
    ) -> std::result::Result<f64, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(EvalError::Unsupported(format!(
                "nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let value = rule(self);
        self.depth -= 1;
        value
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> std::result::Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> std::result::Result<f64, EvalError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(EvalError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> std::result::Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?  (right associative)
    fn power(&mut self) -> std::result::Result<f64, EvalError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<f64, EvalError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.nested(Self::expression)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(self.unsupported()),
                }
            }
            Some(Token::Sqrt) => {
                let value = self.nested(Self::primary)?;
                if value < 0.0 {
                    return Err(EvalError::NotFinite);
                }
                Ok(value.sqrt())
            }
            _ => Err(self.unsupported()),
        }
    }
}

/// A comma between digits followed by exactly three digits
fn is_thousands_separator(chars: &[char], i: usize) -> bool {
    chars[i] == ','
        && i > 0
        && chars[i - 1].is_ascii_digit()
        && chars.len() >= i + 4
        && chars[i + 1..i + 4].iter().all(|c| c.is_ascii_digit())
        && chars.get(i + 4).map_or(true, |c| !c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedProvider;
    use crate::tools::ToolFailure;

    #[test]
    fn test_evaluate_basic_arithmetic() {
        assert_eq!(evaluate("2+2").unwrap(), 4.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
    }

    #[test]
    fn test_evaluate_power_and_unary() {
        assert_eq!(evaluate("2^10").unwrap(), 1024.0);
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("-2^2").unwrap(), -4.0);
        assert_eq!(evaluate("-(3 - 5)").unwrap(), 2.0);
        assert_eq!(evaluate("2^-1").unwrap(), 0.5);
    }

    #[test]
    fn test_evaluate_sqrt_forms() {
        assert_eq!(evaluate("sqrt(81)").unwrap(), 9.0);
        assert_eq!(evaluate("What's the square root of 256?").unwrap(), 16.0);
        assert_eq!(evaluate("sqrt(-4)"), Err(EvalError::NotFinite));
    }

    #[test]
    fn test_evaluate_percent_of_and_lead_ins() {
        assert_eq!(evaluate("15% of 200").unwrap(), 30.0);
        assert_eq!(evaluate("calculate 18% of 250").unwrap(), 45.0);
        assert_eq!(evaluate("What is 6 × 7?").unwrap(), 42.0);
        assert_eq!(evaluate("1,000 + 1").unwrap(), 1001.0);
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("5 % (2-2)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_evaluate_rejects_non_arithmetic() {
        assert!(matches!(evaluate("solve 2x + 5 = 11"), Err(EvalError::Unsupported(_))));
        assert!(matches!(evaluate("(1 + 2"), Err(EvalError::Unsupported(_))));
        assert!(matches!(evaluate("1 2"), Err(EvalError::Unsupported(_))));
        assert!(matches!(evaluate(""), Err(EvalError::Unsupported(_))));
    }

    #[test]
    fn test_evaluate_refuses_runaway_nesting() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(evaluate(&parens), Err(EvalError::Unsupported(_))));

        let signs = format!("{}1", "-".repeat(10_000));
        assert!(matches!(evaluate(&signs), Err(EvalError::Unsupported(_))));

        let roots = format!("{}4", "sqrt ".repeat(10_000));
        assert!(matches!(evaluate(&roots), Err(EvalError::Unsupported(_))));

        let tower = vec!["1"; 10_000].join("^");
        assert!(matches!(evaluate(&tower), Err(EvalError::Unsupported(_))));
    }

    #[test]
    fn test_evaluate_accepts_moderate_nesting() {
        let parens = format!("{}7{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&parens).unwrap(), 7.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(3.5), "3.5");
    }

    #[tokio::test]
    async fn test_calculate_locally_without_model() {
        let provider = Arc::new(ScriptedProvider::new());
        let tool = CalculatorTool::new(provider.clone());
        assert_eq!(tool.calculate("2+2").await, ToolResult::Found("4".to_string()));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_calculate_division_by_zero_explains() {
        let tool = CalculatorTool::new(Arc::new(ScriptedProvider::new()));
        assert_eq!(
            tool.calculate("1/0").await,
            ToolResult::Found(DIVISION_BY_ZERO_REPLY.to_string())
        );
    }

    #[tokio::test]
    async fn test_calculate_delegates_word_problems() {
        let provider = Arc::new(ScriptedProvider::new().then_text("x = 3"));
        let tool = CalculatorTool::new(provider.clone());
        assert_eq!(
            tool.calculate("solve 2x + 5 = 11").await,
            ToolResult::Found("x = 3".to_string())
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_calculate_model_failures_map_to_sentinels() {
        let tool = CalculatorTool::new(Arc::new(ScriptedProvider::new().then_text("")));
        let empty = tool.calculate("integrate x dx").await;
        assert_eq!(
            empty.render(&CALCULATOR_SENTINELS),
            CALCULATOR_SENTINELS.no_information
        );

        let tool = CalculatorTool::new(Arc::new(ScriptedProvider::new().then_fail("down")));
        let failed = tool.calculate("integrate x dx").await;
        assert!(matches!(failed, ToolResult::Failed(ToolFailure::Error(_))));
        assert_eq!(
            failed.render(&CALCULATOR_SENTINELS),
            "My abacus seems to be malfunctioning; I could not perform the calculation."
        );
    }

    #[tokio::test]
    async fn test_execute_reads_expression_argument() {
        let tool = CalculatorTool::new(Arc::new(ScriptedProvider::new()));
        let result = tool
            .execute(serde_json::json!({"expression": "3*3"}))
            .await
            .unwrap();
        assert_eq!(result, ToolResult::Found("9".to_string()));
    }
}
