//! Button fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::field::REQUIRED_MSG;
use crate::locator::{Context, Locator};
use crate::template::{Template, TemplateEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonOption {
    /// The button ID; assigned by 1-based position when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The button text.
    pub label: Template,

    /// Whether the button has the "primary" style.
    #[serde(default)]
    pub primary: bool,

    /// Whether the button is the default option.
    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Locator>,

    #[serde(default)]
    pub options: Vec<ButtonOption>,
}

impl ButtonField {
    fn options_by_id(&self) -> Vec<(String, &ButtonOption)> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, opt)| {
                let id = opt.id.clone().unwrap_or_else(|| (i + 1).to_string());
                (id, opt)
            })
            .collect()
    }

    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        let id = match value {
            Some(Json::String(id)) => id,
            None | Some(Json::Null) => return Err(REQUIRED_MSG.into()),
            Some(_) => return Err("expected an option".into()),
        };
        self.options_by_id()
            .iter()
            .find(|(oid, _)| oid == id)
            .map(|(_, opt)| opt.value.clone())
            .ok_or_else(|| format!("invalid option: {id}"))
    }

    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut one_of = Vec::new();
        let mut default = None;
        for (id, opt) in self.options_by_id() {
            let mut entry = Map::new();
            entry.insert("const".into(), Json::from(id.clone()));
            entry.insert("title".into(), Json::from(engine.render(&opt.label, ctx)?));
            if opt.primary {
                entry.insert("x-primary".into(), Json::from(true));
            }
            one_of.push(Json::Object(entry));
            if opt.default && default.is_none() {
                default = Some(id);
            }
        }

        let mut schema = Map::new();
        schema.insert("x-type".into(), Json::from("button"));
        schema.insert("oneOf".into(), Json::Array(one_of));
        if let Some(default) = default {
            schema.insert("default".into(), Json::from(default));
        }

        Ok(Json::Object(schema))
    }
}
