//! Number fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::field::{normalize, REQUIRED_MSG};
use crate::locator::{Context, Locator};
use crate::template::{Template, TemplateEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Locator>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,

    /// Restrict to integers.
    #[serde(default)]
    pub integer: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
}

impl NumberField {
    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        let Some(raw) = normalize(value) else {
            return if self.optional {
                Ok(Json::Null)
            } else {
                Err(REQUIRED_MSG.into())
            };
        };

        let number = match raw {
            Json::Number(n) => n,
            _ => return Err("expected a number".into()),
        };

        let (parsed, as_f64) = if self.integer {
            match number.as_i64() {
                Some(i) => (Json::from(i), i as f64),
                None => return Err("expected an integer".into()),
            }
        } else {
            match number.as_f64() {
                Some(f) => (Json::from(f), f),
                None => return Err("expected a number".into()),
            }
        };

        if let Some(min) = self.min {
            if as_f64 < min {
                return Err(format!("must be at least {min}"));
            }
        }
        if let Some(max) = self.max {
            if as_f64 > max {
                return Err(format!("must be at most {max}"));
            }
        }

        Ok(parsed)
    }

    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut schema = Map::new();
        schema.insert(
            "type".into(),
            Json::from(if self.integer { "integer" } else { "number" }),
        );
        schema.insert("x-type".into(), Json::from("number"));
        schema.insert("nullable".into(), Json::from(self.optional));

        if let Some(min) = self.min {
            schema.insert("minimum".into(), Json::from(min));
        }
        if let Some(max) = self.max {
            schema.insert("maximum".into(), Json::from(max));
        }
        if let Some(label) = &self.label {
            schema.insert("title".into(), Json::from(engine.render(label, ctx)?));
        }
        if let Some(default) = self.default {
            schema.insert("default".into(), Json::from(default));
        }

        Ok(Json::Object(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(yaml: &str) -> NumberField {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn parses_floats_and_integers() {
        let f = field("{}");
        assert_eq!(f.parse(Some(&json!(1.5))).unwrap(), json!(1.5));

        let int = field("integer: true");
        assert_eq!(int.parse(Some(&json!(2))).unwrap(), json!(2));
        assert!(int.parse(Some(&json!(2.5))).is_err());
    }

    #[test]
    fn rejects_non_numbers() {
        let f = field("{}");
        assert!(f.parse(Some(&json!("2"))).is_err());
        assert!(f.parse(Some(&json!(true))).is_err());
    }

    #[test]
    fn null_requires_optional() {
        assert!(field("{}").parse(None).is_err());
        assert_eq!(field("optional: true").parse(None).unwrap(), Json::Null);
    }

    #[test]
    fn enforces_bounds() {
        let f = field("min: 1\nmax: 3");
        assert!(f.parse(Some(&json!(0))).is_err());
        assert_eq!(f.parse(Some(&json!(2))).unwrap(), json!(2.0));
        assert!(f.parse(Some(&json!(4))).is_err());
    }

    #[test]
    fn schema_shape() {
        let engine = TemplateEngine::new();
        let f = field("integer: true\nmin: 1\nmax: 10");
        assert_eq!(
            f.schema(&engine, &Map::new()).unwrap(),
            json!({
                "type": "integer",
                "x-type": "number",
                "nullable": false,
                "minimum": 1.0,
                "maximum": 10.0,
            })
        );
    }
}
