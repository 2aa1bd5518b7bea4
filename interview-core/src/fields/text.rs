//! Text fields.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::field::{normalize, REQUIRED_MSG};
use crate::locator::{Context, Locator};
use crate::template::{Template, TemplateEngine};

/// The default string max length.
pub const DEFAULT_MAX_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Locator>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// The format; "email" enables a syntactic email check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The minimum length.
    #[serde(default)]
    pub min: usize,

    /// The maximum length.
    #[serde(default = "default_max")]
    pub max: usize,

    /// A regex the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// A JS-compatible regex for client-side validation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_js: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
}

fn default_max() -> usize {
    DEFAULT_MAX_LEN
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

impl TextField {
    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        let trimmed = match normalize(value) {
            None => None,
            Some(Json::String(s)) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Some(_) => return Err("expected a string".into()),
        };

        let Some(text) = trimmed else {
            return if self.optional {
                Ok(Json::Null)
            } else {
                Err(REQUIRED_MSG.into())
            };
        };

        let len = text.chars().count();
        if len < self.min {
            return Err(format!("must be at least {} characters", self.min));
        }
        if len > self.max {
            return Err(format!("must be at most {} characters", self.max));
        }

        if let Some(pattern) = &self.regex {
            let re = Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|_| "invalid pattern".to_string())?;
            if !re.is_match(&text) {
                return Err("does not match the expected format".into());
            }
        }

        if self.format.as_deref() == Some("email") && !email_regex().is_match(&text) {
            return Err(format!("invalid email: {text}"));
        }

        Ok(Json::String(text))
    }

    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut schema = Map::new();
        schema.insert("type".into(), Json::from("string"));
        schema.insert("x-type".into(), Json::from("text"));
        schema.insert("minLength".into(), Json::from(self.min));
        schema.insert("maxLength".into(), Json::from(self.max));
        schema.insert("nullable".into(), Json::from(self.optional));

        if let Some(format) = &self.format {
            schema.insert("format".into(), Json::from(format.clone()));
        }
        if let Some(label) = &self.label {
            schema.insert("title".into(), Json::from(engine.render(label, ctx)?));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), Json::from(default.clone()));
        }
        if let Some(pattern) = self.regex_js.as_ref().or(self.regex.as_ref()) {
            schema.insert("pattern".into(), Json::from(pattern.clone()));
        }

        Ok(Json::Object(schema))
    }
}
