//! Select fields (dropdown, radio, checkbox).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::field::REQUIRED_MSG;
use crate::locator::{Context, Locator};
use crate::template::{Template, TemplateEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// The option ID; assigned by 1-based position when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub label: Template,

    /// Whether this option is selected by default.
    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Locator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Template>,

    /// The component type to display.
    #[serde(default = "default_component")]
    pub component: String,

    /// Minimum number of selections; 0 makes the field optional.
    #[serde(default = "one")]
    pub min: usize,

    /// Maximum number of selections; 1 means a single-value field.
    #[serde(default = "one")]
    pub max: usize,

    #[serde(default)]
    pub options: Vec<SelectOption>,
}

fn default_component() -> String {
    "dropdown".into()
}

fn one() -> usize {
    1
}

impl SelectField {
    pub fn is_single_value(&self) -> bool {
        self.max == 1
    }

    pub fn optional(&self) -> bool {
        self.min == 0
    }

    /// Options paired with their effective IDs, in declared order.
    fn options_by_id(&self) -> Vec<(String, &SelectOption)> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, opt)| {
                let id = opt.id.clone().unwrap_or_else(|| (i + 1).to_string());
                (id, opt)
            })
            .collect()
    }

    fn convert(&self, id: &str) -> std::result::Result<Json, String> {
        self.options_by_id()
            .iter()
            .find(|(oid, _)| oid == id)
            .map(|(_, opt)| opt.value.clone())
            .ok_or_else(|| format!("invalid option: {id}"))
    }

    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        if self.is_single_value() {
            match value {
                None | Some(Json::Null) => {
                    if self.optional() {
                        Ok(Json::Null)
                    } else {
                        Err(REQUIRED_MSG.into())
                    }
                }
                Some(Json::String(id)) => self.convert(id),
                Some(_) => Err("expected a single option".into()),
            }
        } else {
            let items = match value {
                Some(Json::Array(items)) => items,
                _ => return Err("expected a list of options".into()),
            };
            if items.len() < self.min {
                return Err(format!("select at least {}", self.min));
            }
            if items.len() > self.max {
                return Err(format!("select at most {}", self.max));
            }
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let id = item.as_str().ok_or("expected a list of options")?;
                values.push(self.convert(id)?);
            }
            Ok(Json::Array(values))
        }
    }

    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut one_of = Vec::new();
        for (id, opt) in self.options_by_id() {
            let mut entry = Map::new();
            entry.insert("const".into(), Json::from(id));
            entry.insert("title".into(), Json::from(engine.render(&opt.label, ctx)?));
            one_of.push(Json::Object(entry));
        }

        let mut schema = Map::new();
        if self.is_single_value() {
            if self.optional() {
                let mut null_arm = Map::new();
                null_arm.insert("type".into(), Json::from("null"));
                one_of.push(Json::Object(null_arm));
            }
            schema.insert("type".into(), Json::from("string"));
            schema.insert("x-type".into(), Json::from("select"));
            schema.insert("x-component".into(), Json::from(self.component.clone()));
            schema.insert("oneOf".into(), Json::Array(one_of));
            schema.insert("nullable".into(), Json::from(self.optional()));
        } else {
            let mut items = Map::new();
            items.insert("oneOf".into(), Json::Array(one_of));
            schema.insert("type".into(), Json::from("array"));
            schema.insert("x-type".into(), Json::from("select"));
            schema.insert("x-component".into(), Json::from(self.component.clone()));
            schema.insert("items".into(), Json::Object(items));
            schema.insert("minItems".into(), Json::from(self.min));
            schema.insert("maxItems".into(), Json::from(self.max));
            schema.insert("uniqueItems".into(), Json::from(true));
        }

        if let Some(label) = &self.label {
            schema.insert("title".into(), Json::from(engine.render(label, ctx)?));
        }

        let defaults: Vec<Json> = self
            .options_by_id()
            .into_iter()
            .filter(|(_, opt)| opt.default)
            .map(|(id, _)| Json::from(id))
            .collect();
        if !defaults.is_empty() {
            if self.is_single_value() {
                schema.insert("default".into(), defaults[0].clone());
            } else {
                schema.insert("default".into(), Json::Array(defaults));
            }
        }

        Ok(Json::Object(schema))
    }
}
