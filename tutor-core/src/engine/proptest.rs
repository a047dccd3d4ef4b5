//! Property-based tests for the deterministic engine.
//!
//! - Embedded two-operand expressions are always solved correctly
//! - Extraction is a pure function of its input
//! - Messages without arithmetic or keywords always land in the general pool
//! - Physics keywords are recognized regardless of case

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::engine::arithmetic::{extract_expression, solve, Operator};
    use crate::engine::topics::{Subject, TopicClassifier};
    use crate::engine::{DeterministicEngine, Route};

    fn operator() -> impl Strategy<Value = Operator> {
        prop_oneof![
            Just(Operator::Add),
            Just(Operator::Subtract),
            Just(Operator::Multiply),
        ]
    }

    // Letters that can't spell any built-in keyword and no digits or operators.
    fn plain_text() -> impl Strategy<Value = String> {
        "[xyzqw ]{0,40}"
    }

    proptest! {
        /// `a op b=` embedded in text solves to the algebraic result.
        #[test]
        fn embedded_expression_is_solved(
            a in 0i32..100_000,
            b in 0i32..100_000,
            op in operator(),
            prefix in plain_text(),
        ) {
            let message = format!("{} {}{}{}=", prefix, a, op.symbol(), b);
            let expr = extract_expression(&message).expect("expression should be found");
            prop_assert_eq!(expr.first_operand, a);
            prop_assert_eq!(expr.second_operand, b);
            prop_assert_eq!(expr.operator, op);

            let solution = solve(&expr);
            let expected = match op {
                Operator::Add => i64::from(a) + i64::from(b),
                Operator::Subtract => i64::from(a) - i64::from(b),
                Operator::Multiply => i64::from(a) * i64::from(b),
            };
            prop_assert_eq!(solution.result, expected);
            prop_assert!(solution.explanation.contains(&a.to_string()));
            prop_assert!(solution.explanation.contains(&b.to_string()));
            prop_assert!(solution.explanation.contains(&expected.to_string()));
        }

        /// Extraction never panics and is idempotent.
        #[test]
        fn extraction_is_pure(text in ".{0,80}") {
            prop_assert_eq!(extract_expression(&text), extract_expression(&text));
        }

        /// Solving the same expression twice yields byte-identical text.
        #[test]
        fn solving_is_deterministic(a in any::<i32>(), b in any::<i32>(), op in operator()) {
            let expr = crate::engine::MathExpression::new(a, op, b);
            prop_assert_eq!(solve(&expr), solve(&expr));
        }

        /// No arithmetic and no keyword means the general pool.
        #[test]
        fn unmatched_text_routes_to_general(text in plain_text()) {
            let engine = DeterministicEngine::default();
            prop_assert_eq!(engine.route(&text), Route::General);
        }

        /// Physics keywords match in any letter case.
        #[test]
        fn physics_keyword_any_case(mask in prop::collection::vec(any::<bool>(), 7)) {
            let word: String = "gravity"
                .chars()
                .zip(mask)
                .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
                .collect();
            let message = format!("tell me about {}", word);

            let classifier = TopicClassifier::default();
            prop_assert_eq!(classifier.classify(&message), Some(Subject::Physics));

            let engine = DeterministicEngine::default();
            prop_assert_eq!(engine.route(&message), Route::Subject(Subject::Physics));
        }
    }
}
