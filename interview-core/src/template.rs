//! Template and expression evaluation.
//!
//! Thin adapter over minijinja. The engine runs with strict undefined
//! behavior and every map/list in the context is wrapped in a
//! lookup-tracking object, so an undefined access surfaces as
//! [`InterviewError::Undefined`] carrying the deepest missing [`Locator`] —
//! the signal the runner converts into a question.

use std::sync::{Arc, Mutex};

use minijinja::value::{Enumerator, Object, ObjectRepr, Value as TmplValue};
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{InterviewError, Result};
use crate::locator::{Context, Key, Locator};

/// A text template, rendered against the merged template context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(pub String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

/// An expression evaluated against the merged template context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(pub String);

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

/// The template engine handle passed explicitly through the runner.
#[derive(Debug, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    fn environment<'source>(&self) -> Environment<'source> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        // plain-text output
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env
    }

    /// Render a template to a string.
    pub fn render(&self, template: &Template, ctx: &Context) -> Result<String> {
        let (root, probe) = tracked_root(ctx);
        self.environment()
            .render_str(&template.0, root)
            .map_err(|e| convert_error(e, &probe))
    }

    /// Evaluate an expression to a JSON value.
    pub fn evaluate(&self, expr: &Expression, ctx: &Context) -> Result<Json> {
        let value = self.evaluate_raw(expr, ctx)?;
        serde_json::to_value(&value).map_err(|e| {
            InterviewError::Misconfigured(format!(
                "expression {:?} produced an unserializable value: {e}",
                expr.0
            ))
        })
    }

    /// Evaluate an expression and coerce the result to a boolean.
    pub fn evaluate_bool(&self, expr: &Expression, ctx: &Context) -> Result<bool> {
        Ok(self.evaluate_raw(expr, ctx)?.is_true())
    }

    fn evaluate_raw(&self, expr: &Expression, ctx: &Context) -> Result<TmplValue> {
        let env = self.environment();
        let compiled = env.compile_expression(&expr.0).map_err(|e| {
            InterviewError::Misconfigured(format!("invalid expression {:?}: {e}", expr.0))
        })?;
        let (root, probe) = tracked_root(ctx);
        let value = compiled.eval(root).map_err(|e| convert_error(e, &probe))?;
        // An expression can evaluate *to* undefined without using it, which
        // raises no error even in strict mode. Surface it here.
        if value.is_undefined() {
            return match probe.take() {
                Some(locator) => Err(InterviewError::Undefined(locator)),
                None => Err(InterviewError::Misconfigured(format!(
                    "expression {:?} evaluated to undefined",
                    expr.0
                ))),
            };
        }
        Ok(value)
    }
}

fn convert_error(err: minijinja::Error, probe: &Probe) -> InterviewError {
    if err.kind() == ErrorKind::UndefinedError {
        if let Some(locator) = probe.take() {
            return InterviewError::Undefined(locator);
        }
    }
    InterviewError::Misconfigured(format!("template error: {err}"))
}

// ─── Lookup tracking ──────────────────────────────────────────

/// Shared cell recording the most recent failed lookup path.
#[derive(Debug, Clone, Default)]
struct Probe(Arc<Mutex<Option<Locator>>>);

impl Probe {
    fn record(&self, locator: Locator) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(locator);
        }
    }

    fn take(&self) -> Option<Locator> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn tracked_root(ctx: &Context) -> (TmplValue, Probe) {
    let probe = Probe::default();
    let root = TmplValue::from_object(TrackedMap {
        path: None,
        entries: ctx.clone(),
        probe: probe.clone(),
    });
    (root, probe)
}

fn child_path(parent: &Option<Locator>, key: Key) -> Locator {
    match parent {
        Some(target) => Locator::Index {
            target: Box::new(target.clone()),
            key,
        },
        None => match key {
            Key::Str(name) => Locator::Variable { name },
            Key::Int(i) => Locator::Variable {
                name: i.to_string(),
            },
        },
    }
}

fn wrap(value: &Json, path: Locator, probe: &Probe) -> TmplValue {
    match value {
        Json::Object(map) => TmplValue::from_object(TrackedMap {
            path: Some(path),
            entries: map.clone(),
            probe: probe.clone(),
        }),
        Json::Array(items) => TmplValue::from_object(TrackedList {
            path: Some(path),
            items: items.clone(),
            probe: probe.clone(),
        }),
        scalar => TmplValue::from_serialize(scalar),
    }
}

#[derive(Debug)]
struct TrackedMap {
    path: Option<Locator>,
    entries: Context,
    probe: Probe,
}

impl Object for TrackedMap {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &TmplValue) -> Option<TmplValue> {
        let child = match key.as_str() {
            Some(name) => {
                let child = child_path(&self.path, Key::Str(name.to_string()));
                if let Some(value) = self.entries.get(name) {
                    return Some(wrap(value, child, &self.probe));
                }
                child
            }
            None => {
                let index = i64::try_from(key.clone()).ok()?;
                child_path(&self.path, Key::Int(index.max(0) as u64))
            }
        };
        self.probe.record(child);
        None
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(
            self.entries
                .keys()
                .map(|k| TmplValue::from(k.clone()))
                .collect(),
        )
    }
}

#[derive(Debug)]
struct TrackedList {
    path: Option<Locator>,
    items: Vec<Json>,
    probe: Probe,
}

impl Object for TrackedList {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Seq
    }

    fn get_value(self: &Arc<Self>, key: &TmplValue) -> Option<TmplValue> {
        let raw = i64::try_from(key.clone()).ok()?;
        let index = if raw < 0 { raw + self.items.len() as i64 } else { raw };
        if index >= 0 {
            if let Some(value) = self.items.get(index as usize) {
                let child = child_path(&self.path, Key::Int(index as u64));
                return Some(wrap(value, child, &self.probe));
            }
        }
        self.probe
            .record(child_path(&self.path, Key::Int(raw.max(0) as u64)));
        None
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Seq(self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Json) -> Context {
        match value {
            Json::Object(map) => map,
            _ => panic!("context fixture must be an object"),
        }
    }

    #[test]
    fn renders_nested_values() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"person": {"name": "Test"}, "n": 2}));
        let out = engine
            .render(&Template::new("{{ person.name }}: {{ n }}"), &ctx)
            .unwrap();
        assert_eq!(out, "Test: 2");
    }

    #[test]
    fn undefined_variable_carries_locator() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"a": {"b": 1}}));
        let err = engine
            .render(&Template::new("{{ a.x.y }}"), &ctx)
            .unwrap_err();
        match err {
            InterviewError::Undefined(loc) => assert_eq!(loc.to_string(), "a.x"),
            other => panic!("expected undefined, got {other:?}"),
        }

        let err = engine
            .render(&Template::new("{{ missing }}"), &ctx)
            .unwrap_err();
        match err {
            InterviewError::Undefined(loc) => assert_eq!(loc.to_string(), "missing"),
            other => panic!("expected undefined, got {other:?}"),
        }
    }

    #[test]
    fn default_filter_suppresses_undefined() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({}));
        let out = engine
            .render(&Template::new("{{ missing|default(\"x\") }}"), &ctx)
            .unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn evaluates_expressions_to_json() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"a": {"b": [1, 2]}, "flag": false}));
        assert_eq!(
            engine.evaluate(&Expression::new("a.b[1]"), &ctx).unwrap(),
            json!(2)
        );
        assert_eq!(
            engine.evaluate(&Expression::new("a.b"), &ctx).unwrap(),
            json!([1, 2])
        );
        assert!(!engine.evaluate_bool(&Expression::new("flag"), &ctx).unwrap());
        assert!(engine
            .evaluate_bool(&Expression::new("a.b[0] == 1"), &ctx)
            .unwrap());
    }

    #[test]
    fn expression_undefined_carries_locator() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"use_a1": true}));
        let err = engine
            .evaluate_bool(&Expression::new("use_a2"), &ctx)
            .unwrap_err();
        match err {
            InterviewError::Undefined(loc) => assert_eq!(loc.to_string(), "use_a2"),
            other => panic!("expected undefined, got {other:?}"),
        }
    }
}
