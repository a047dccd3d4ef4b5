//! Two-operand arithmetic extraction and worked solutions.
//!
//! Extraction is deliberately lax: everything that is not part of an
//! arithmetic expression is stripped first, so `"what is 5+3?"` and
//! `"5 + 3 ="` both yield `5 + 3`. Anything with more than two operands,
//! non-integer operands, or division is a miss and is left to the topic
//! classifier.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NON_EXPRESSION_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9+\-*/().=]").expect("invalid regex"));

/// Operators the solver knows how to explain.
///
/// `/` survives cleaning but has no variant here; division is not solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    /// Detection order used by the extractor.
    pub const DETECTION_ORDER: [Operator; 3] =
        [Operator::Add, Operator::Subtract, Operator::Multiply];

    /// Character this operator is written with in raw input.
    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
        }
    }

    /// Symbol used in explanations.
    pub fn display_symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
        }
    }

    /// Apply the operator. Operands are `i32`, so the `i64` result never overflows.
    pub fn apply(&self, a: i32, b: i32) -> i64 {
        let (a, b) = (i64::from(a), i64::from(b));
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
        }
    }
}

/// A recognized `a <op> b` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathExpression {
    pub first_operand: i32,
    pub second_operand: i32,
    pub operator: Operator,
}

impl MathExpression {
    pub fn new(first_operand: i32, operator: Operator, second_operand: i32) -> Self {
        Self {
            first_operand,
            second_operand,
            operator,
        }
    }
}

impl std::fmt::Display for MathExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.first_operand,
            self.operator.display_symbol(),
            self.second_operand
        )
    }
}

/// A solved expression with its worked explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub expression: MathExpression,
    pub result: i64,
    pub explanation: String,
}

/// Find a two-operand expression in free-form text.
///
/// Only the first operator present (in `+`, `-`, `*` order) is tried; if
/// its operands don't parse the whole extraction misses.
pub fn extract_expression(text: &str) -> Option<MathExpression> {
    let cleaned = NON_EXPRESSION_CHARS.replace_all(text, "");

    let operator = Operator::DETECTION_ORDER
        .into_iter()
        .find(|op| cleaned.contains(op.symbol()))?;

    let mut segments = cleaned.split(operator.symbol());
    let (first, second) = match (segments.next(), segments.next(), segments.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => return None,
    };

    let first_operand = first.parse::<i32>().ok()?;
    let second_operand = second.split('=').next()?.parse::<i32>().ok()?;

    Some(MathExpression::new(first_operand, operator, second_operand))
}

/// Solve an expression and build its step-by-step explanation.
///
/// Output is a pure function of the expression.
pub fn solve(expression: &MathExpression) -> Solution {
    let a = expression.first_operand;
    let b = expression.second_operand;
    let op = expression.operator;
    let result = op.apply(a, b);
    let sym = op.display_symbol();

    let mut explanation = format!("**{a} {sym} {b} = {result}**\n\nLet's work through it step by step:\n");

    match op {
        Operator::Add => {
            explanation.push_str(&format!(
                "1. Start with the first number: {a}\n\
                 2. Add the second number: {b}\n\
                 3. Combine them: {a} + {b} = {result}\n\n\
                 Check your work: {result} - {b} = {a}\n\n\
                 Addition puts two quantities together into a single total."
            ));
        }
        Operator::Subtract => {
            explanation.push_str(&format!(
                "1. Start with the first number: {a}\n\
                 2. Take away the second number: {b}\n\
                 3. What remains: {a} - {b} = {result}\n\n\
                 Check your work: {result} + {b} = {a}\n\n\
                 Subtraction finds the difference between two quantities."
            ));
            if result < 0 {
                explanation.push_str(&format!(
                    "\n\nThe answer is negative because {b} is larger than {a}."
                ));
            }
        }
        Operator::Multiply => {
            let step = match b {
                0 => "Multiply by zero: any number taken 0 times is 0".to_string(),
                b if b < 0 => format!(
                    "Count it {} times, then flip the sign because {b} is negative",
                    i64::from(b).abs()
                ),
                b => format!("Count it {b} times"),
            };
            explanation.push_str(&format!(
                "1. Take the first number: {a}\n\
                 2. {step}\n\
                 3. The total: {a} × {b} = {result}\n\n"
            ));
            if (2..=5).contains(&b) {
                let repeated = vec![a.to_string(); b as usize].join(" + ");
                explanation.push_str(&format!("Written out: {repeated} = {result}\n\n"));
            }
            explanation.push_str("Multiplication is a shortcut for adding the same number again and again.");
        }
    }

    Solution {
        expression: *expression,
        result,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_simple_addition() {
        assert_eq!(
            extract_expression("what is 5+3"),
            Some(MathExpression::new(5, Operator::Add, 3))
        );
        assert_eq!(
            extract_expression("12 + 7 ="),
            Some(MathExpression::new(12, Operator::Add, 7))
        );
    }

    #[test]
    fn test_extract_subtraction_and_multiplication() {
        assert_eq!(
            extract_expression("10-4="),
            Some(MathExpression::new(10, Operator::Subtract, 4))
        );
        assert_eq!(
            extract_expression("Can you do 6 * 7 for me?"),
            Some(MathExpression::new(6, Operator::Multiply, 7))
        );
    }

    #[test]
    fn test_extract_uses_first_detected_operator() {
        // '+' wins over '-' even though '-' appears first in the text.
        assert_eq!(
            extract_expression("5+-3"),
            Some(MathExpression::new(5, Operator::Add, -3))
        );
        // '+' is detected, its split fails, and '*' is never tried.
        assert_eq!(extract_expression("2*3+"), None);
    }

    #[test]
    fn test_extract_ignores_text_after_equals() {
        assert_eq!(
            extract_expression("12+7=19"),
            Some(MathExpression::new(12, Operator::Add, 7))
        );
    }

    #[test]
    fn test_extract_misses() {
        assert_eq!(extract_expression("Explain Newton's laws"), None);
        assert_eq!(extract_expression("hello"), None);
        assert_eq!(extract_expression(""), None);
        // More than two operands
        assert_eq!(extract_expression("1+2+3"), None);
        assert_eq!(extract_expression("2024-01-05"), None);
        // Non-integer operands
        assert_eq!(extract_expression("3.5+2"), None);
        assert_eq!(extract_expression("(5)+3"), None);
        assert_eq!(extract_expression("+"), None);
        // Division is not recognized
        assert_eq!(extract_expression("10/2="), None);
    }

    #[test]
    fn test_extract_rejects_out_of_range_operands() {
        assert_eq!(extract_expression("99999999999+1"), None);
    }

    #[test]
    fn test_solve_addition() {
        let solution = solve(&MathExpression::new(5, Operator::Add, 3));
        assert_eq!(solution.result, 8);
        assert!(solution.explanation.contains("5 + 3 = 8"));
        assert!(solution.explanation.contains("Check your work: 8 - 3 = 5"));
    }

    #[test]
    fn test_solve_subtraction_negative() {
        let solution = solve(&MathExpression::new(3, Operator::Subtract, 10));
        assert_eq!(solution.result, -7);
        assert!(solution.explanation.contains("3 - 10 = -7"));
        assert!(solution.explanation.contains("negative"));

        let solution = solve(&MathExpression::new(10, Operator::Subtract, 4));
        assert!(!solution.explanation.contains("negative"));
    }

    #[test]
    fn test_solve_multiplication() {
        let solution = solve(&MathExpression::new(6, Operator::Multiply, 3));
        assert_eq!(solution.result, 18);
        assert!(solution.explanation.contains("6 × 3 = 18"));
        assert!(solution.explanation.contains("Written out: 6 + 6 + 6 = 18"));

        let solution = solve(&MathExpression::new(6, Operator::Multiply, 12));
        assert!(!solution.explanation.contains("Written out"));
    }

    #[test]
    fn test_solve_multiplication_by_zero_and_negative() {
        let zero = solve(&MathExpression::new(7, Operator::Multiply, 0));
        assert_eq!(zero.result, 0);
        assert!(zero.explanation.contains("2. Multiply by zero"));
        assert!(!zero.explanation.contains("Count it 0 times"));

        let negative = solve(&MathExpression::new(4, Operator::Multiply, -3));
        assert_eq!(negative.result, -12);
        assert!(negative.explanation.contains("2. Count it 3 times, then flip the sign"));
        assert!(!negative.explanation.contains("Count it -3 times"));

        let positive = solve(&MathExpression::new(4, Operator::Multiply, 3));
        assert!(positive.explanation.contains("2. Count it 3 times\n"));
    }

    #[test]
    fn test_solve_extremes_do_not_overflow() {
        let solution = solve(&MathExpression::new(i32::MAX, Operator::Multiply, i32::MAX));
        assert_eq!(solution.result, i64::from(i32::MAX) * i64::from(i32::MAX));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let expr = MathExpression::new(12, Operator::Add, 7);
        assert_eq!(solve(&expr), solve(&expr));
        assert_eq!(
            solve(&expr).explanation,
            "**12 + 7 = 19**\n\n\
             Let's work through it step by step:\n\
             1. Start with the first number: 12\n\
             2. Add the second number: 7\n\
             3. Combine them: 12 + 7 = 19\n\n\
             Check your work: 19 - 7 = 12\n\n\
             Addition puts two quantities together into a single total."
        );
    }
}
