//! Preconditions evaluated before a rule's matcher runs.
//!
//! A condition that cannot be evaluated counts as `false`: a broken
//! precondition suppresses the rule rather than producing a false positive.

use crate::context::LintInput;
use crate::engine::{self, RuleError};
use crate::rule::Rule;

use std::fmt;
use tracing::{debug, warn};

type Predicate = Box<dyn Fn(&LintInput) -> bool + Send + Sync>;

/// A named predicate over a [`LintInput`].
pub struct Condition {
    name: &'static str,
    predicate: Predicate,
}

impl Condition {
    /// Wraps an infallible predicate.
    #[must_use]
    pub fn new<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&LintInput) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            predicate: Box::new(predicate),
        }
    }

    /// Wraps a fallible predicate; errors evaluate to `false`.
    #[must_use]
    pub fn fallible<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&LintInput) -> Result<bool, RuleError> + Send + Sync + 'static,
    {
        Self::new(name, move |input| match predicate(input) {
            Ok(holds) => holds,
            Err(e) => {
                warn!(
                    "Condition `{}` failed on {}: {}",
                    name,
                    input.rel_path().display(),
                    e
                );
                false
            }
        })
    }

    /// Holds when the nested rule yields at least one recommendation.
    ///
    /// The nested rule must not (transitively) depend on the rule owning
    /// this condition.
    #[must_use]
    pub fn matches(name: &'static str, rule: Rule) -> Self {
        Self::fallible(name, move |input| {
            engine::evaluate(&rule, input).map(|recs| !recs.is_empty())
        })
    }

    /// Holds when the nested rule yields no recommendation.
    #[must_use]
    pub fn no_match(name: &'static str, rule: Rule) -> Self {
        Self::fallible(name, move |input| {
            engine::evaluate(&rule, input).map(|recs| recs.is_empty())
        })
    }

    /// Condition name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn check(&self, input: &LintInput) -> bool {
        (self.predicate)(input)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Returns true when every condition holds; stops at the first failure.
#[must_use]
pub fn all_pass(conditions: &[Condition], input: &LintInput) -> bool {
    conditions.iter().all(|condition| {
        let holds = condition.check(input);
        if !holds {
            debug!(
                "Condition `{}` does not hold for {}",
                condition.name(),
                input.rel_path().display()
            );
        }
        holds
    })
}
