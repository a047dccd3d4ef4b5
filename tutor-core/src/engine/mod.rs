//! Deterministic, rule-based tutor engine.
//!
//! Used whenever the remote provider is unavailable. A message is routed
//! in a fixed order:
//!
//! 1. **Arithmetic**: a two-operand `+`, `-` or `*` expression is solved
//!    with a worked explanation.
//! 2. **Subject**: keyword classification picks a subject pool.
//! 3. **General**: everything else draws from the general pool.
//!
//! ```rust,ignore
//! use tutor_core::engine::{DeterministicEngine, Route};
//!
//! let engine = DeterministicEngine::default();
//! let answer = engine.answer("what is 5+3");
//! assert!(matches!(answer.route, Route::Arithmetic(_)));
//! ```

pub mod arithmetic;
pub mod random;
pub mod responses;
pub mod topics;

#[cfg(test)]
mod proptest;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use arithmetic::{extract_expression, solve, MathExpression, Operator, Solution};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use responses::{CannedResponse, PoolKind, ResponsePool, ResponseSelector};
pub use topics::{Subject, TopicClassifier};

/// How the engine handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", content = "detail", rename_all = "snake_case")]
pub enum Route {
    Arithmetic(MathExpression),
    Subject(Subject),
    General,
}

impl Route {
    /// The canned pool this route draws from, if any.
    pub fn pool(&self) -> Option<PoolKind> {
        match self {
            Route::Arithmetic(_) => None,
            Route::Subject(subject) => Some(PoolKind::Subject(*subject)),
            Route::General => Some(PoolKind::General),
        }
    }
}

/// Engine output before context annotation and the closing tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAnswer {
    pub route: Route,
    pub body: String,
}

/// Arithmetic solver, topic classifier and canned pools wired together.
#[derive(Debug, Clone, Default)]
pub struct DeterministicEngine {
    classifier: TopicClassifier,
    selector: ResponseSelector,
}

impl DeterministicEngine {
    pub fn new(classifier: TopicClassifier, selector: ResponseSelector) -> Self {
        Self {
            classifier,
            selector,
        }
    }

    /// Engine with default keywords and the given random source.
    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self::new(TopicClassifier::default(), ResponseSelector::new(random))
    }

    /// Decide the route for a message without building any text.
    pub fn route(&self, message: &str) -> Route {
        if let Some(expression) = extract_expression(message) {
            return Route::Arithmetic(expression);
        }
        match self.classifier.classify(message) {
            Some(subject) => Route::Subject(subject),
            None => Route::General,
        }
    }

    /// Route a message and produce its answer body.
    pub fn answer(&self, message: &str) -> EngineAnswer {
        let route = self.route(message);
        let body = match route {
            Route::Arithmetic(expression) => solve(&expression).explanation,
            Route::Subject(subject) => self.selector.select(PoolKind::Subject(subject)).body,
            Route::General => self.selector.select(PoolKind::General).body,
        };
        EngineAnswer { route, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_arithmetic_first() {
        let engine = DeterministicEngine::default();
        // Arithmetic wins even when a subject keyword is present.
        assert_eq!(
            engine.route("math: 5+3"),
            Route::Arithmetic(MathExpression::new(5, Operator::Add, 3))
        );
    }

    #[test]
    fn test_route_subject_and_general() {
        let engine = DeterministicEngine::default();
        assert_eq!(engine.route("Explain Newton's laws"), Route::Subject(Subject::Physics));
        assert_eq!(engine.route("hello"), Route::General);
        assert_eq!(engine.route(""), Route::General);
        // Division falls through to classification.
        assert_eq!(engine.route("10/2="), Route::General);
    }

    #[test]
    fn test_answer_bodies() {
        let engine = DeterministicEngine::default();

        let answer = engine.answer("10-4=");
        assert!(answer.body.contains("10 - 4 = 6"));

        let answer = engine.answer("tell me about gravity");
        let pool = ResponsePool::for_kind(PoolKind::Subject(Subject::Physics));
        assert!(answer.body.starts_with(pool.preamble));
        assert!(pool.templates.iter().any(|t| answer.body.contains(t)));
    }

    #[test]
    fn test_route_pool() {
        assert_eq!(Route::General.pool(), Some(PoolKind::General));
        assert_eq!(
            Route::Subject(Subject::Math).pool(),
            Some(PoolKind::Subject(Subject::Math))
        );
        assert_eq!(
            Route::Arithmetic(MathExpression::new(1, Operator::Add, 1)).pool(),
            None
        );
    }
}
