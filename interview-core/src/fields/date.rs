//! Date fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::field::{normalize, REQUIRED_MSG};
use crate::locator::{Context, Locator};
use crate::template::{Template, TemplateEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Locator>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<NaiveDate>,
}

impl DateField {
    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        let Some(raw) = normalize(value) else {
            return if self.optional {
                Ok(Json::Null)
            } else {
                Err(REQUIRED_MSG.into())
            };
        };

        let text = match raw {
            Json::String(s) => s.trim(),
            _ => return Err("expected a date".into()),
        };

        let date: NaiveDate = text
            .parse()
            .map_err(|_| format!("invalid date: {text}"))?;

        if let Some(min) = self.min {
            if date < min {
                return Err(format!("must not be before {min}"));
            }
        }
        if let Some(max) = self.max {
            if date > max {
                return Err(format!("must not be after {max}"));
            }
        }

        Ok(Json::String(date.format("%Y-%m-%d").to_string()))
    }

    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut schema = Map::new();
        schema.insert("type".into(), Json::from("string"));
        schema.insert("format".into(), Json::from("date"));
        schema.insert("x-type".into(), Json::from("date"));
        schema.insert("nullable".into(), Json::from(self.optional));

        if let Some(min) = self.min {
            schema.insert("x-minimum".into(), Json::from(min.to_string()));
        }
        if let Some(max) = self.max {
            schema.insert("x-maximum".into(), Json::from(max.to_string()));
        }
        if let Some(label) = &self.label {
            schema.insert("title".into(), Json::from(engine.render(label, ctx)?));
        }
        if let Some(default) = self.default {
            schema.insert("default".into(), Json::from(default.to_string()));
        }

        Ok(Json::Object(schema))
    }
}
