//! Adapter around the `meval` expression engine used by the calculator panel.
//!
//! The engine itself defines the accepted grammar; this crate pins down the
//! contract the rest of shaderdesk relies on: an [`Evaluator`] must be
//! constructed before use (construction builds the evaluation context once),
//! and [`Evaluator::evaluate`] turns any engine failure into an [`EvalError`]
//! instead of letting it escape.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to parse expression: {0}")]
    Parse(String),

    #[error("failed to evaluate expression: {0}")]
    Eval(String),
}

/// Expression evaluator with a pre-built constant/function context.
///
/// Holding an `Evaluator` value is the proof of initialization; there is no
/// way to evaluate without one.
pub struct Evaluator {
    context: meval::Context<'static>,
}

impl Evaluator {
    pub fn new() -> Self {
        let mut context = meval::Context::new();
        context.var("tau", std::f64::consts::TAU);
        Self { context }
    }

    /// Evaluates `expression` against the built-in context.
    ///
    /// Called freshly on every calculate action; results are never cached.
    pub fn evaluate(&self, expression: &str) -> Result<f64, EvalError> {
        let parsed: meval::Expr = expression
            .parse()
            .map_err(|err: meval::Error| EvalError::Parse(err.to_string()))?;
        let value = parsed
            .eval_with_context(&self.context)
            .map_err(|err| EvalError::Eval(err.to_string()))?;
        debug!(expression, value, "evaluated expression");
        Ok(value)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
