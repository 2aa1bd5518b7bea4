//! `when` guards and condition lists.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::Context;
use crate::template::{Expression, TemplateEngine};

/// One guard entry: a bare boolean or an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Literal(bool),
    Expr(Expression),
}

/// A single condition or a sequence of conditions, ANDed together.
///
/// An undefined variable inside a condition propagates out — it is not
/// treated as "false" — so the runner can ask a question for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conditions {
    Single(Condition),
    All(Vec<Condition>),
}

impl Default for Conditions {
    fn default() -> Self {
        Conditions::All(Vec::new())
    }
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        matches!(self, Conditions::All(items) if items.is_empty())
    }

    fn entries(&self) -> &[Condition] {
        match self {
            Conditions::Single(single) => std::slice::from_ref(single),
            Conditions::All(items) => items,
        }
    }

    /// Evaluate all conditions; truthy iff every entry is truthy.
    pub fn evaluate(&self, engine: &TemplateEngine, ctx: &Context) -> Result<bool> {
        for entry in self.entries() {
            let truthy = match entry {
                Condition::Literal(value) => *value,
                Condition::Expr(expr) => engine.evaluate_bool(expr, ctx)?,
            };
            if !truthy {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Force-evaluate every entry, discarding the results. Used by the eval
    /// step to trigger undefined-variable resolution.
    pub fn force(&self, engine: &TemplateEngine, ctx: &Context) -> Result<()> {
        for entry in self.entries() {
            if let Condition::Expr(expr) = entry {
                engine.evaluate(expr, ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterviewError;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> Context {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("context fixture must be an object"),
        }
    }

    #[test]
    fn deserializes_all_forms() {
        let single: Conditions = serde_yaml::from_str("use_a1").unwrap();
        assert_eq!(
            single,
            Conditions::Single(Condition::Expr(Expression::new("use_a1")))
        );

        let boolean: Conditions = serde_yaml::from_str("false").unwrap();
        assert_eq!(boolean, Conditions::Single(Condition::Literal(false)));

        let many: Conditions = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(
            many,
            Conditions::All(vec![
                Condition::Expr(Expression::new("a")),
                Condition::Expr(Expression::new("b")),
            ])
        );
    }

    #[test]
    fn empty_conditions_are_truthy() {
        let engine = TemplateEngine::new();
        assert!(Conditions::default()
            .evaluate(&engine, &ctx(json!({})))
            .unwrap());
    }

    #[test]
    fn conditions_are_anded() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"a": true, "b": false}));
        let both: Conditions = serde_yaml::from_str("[a, b]").unwrap();
        assert!(!both.evaluate(&engine, &ctx).unwrap());
        let just_a: Conditions = serde_yaml::from_str("[a]").unwrap();
        assert!(just_a.evaluate(&engine, &ctx).unwrap());
    }

    #[test]
    fn undefined_condition_propagates() {
        let engine = TemplateEngine::new();
        let cond: Conditions = serde_yaml::from_str("missing").unwrap();
        let err = cond.evaluate(&engine, &ctx(json!({}))).unwrap_err();
        assert!(matches!(err, InterviewError::Undefined(_)));
    }
}
