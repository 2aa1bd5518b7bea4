//! Questions: one screen of fields with an aggregate schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::{InputError, InterviewError, Result};
use crate::field::Field;
use crate::locator::{Context, Locator};
use crate::logic::Conditions;
use crate::template::{Template, TemplateEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// The question ID, unique within an interview.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Template>,

    /// Field order is significant: responses are keyed by position.
    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

/// The wire name of the field at position `i`.
pub fn field_name(i: usize) -> String {
    format!("field_{i}")
}

impl Question {
    /// The aggregate JSON schema for this question. A field is required iff
    /// its schema is not nullable.
    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (i, field) in self.fields.iter().enumerate() {
            let name = field_name(i);
            properties.insert(name.clone(), field.schema(engine, ctx)?);
            if !field.optional() {
                required.push(Json::from(name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Json::from("object"));
        schema.insert("properties".into(), Json::Object(properties));
        schema.insert("required".into(), Json::Array(required));

        if let Some(title) = &self.title {
            schema.insert("title".into(), Json::from(engine.render(title, ctx)?));
        }
        if let Some(description) = &self.description {
            schema.insert(
                "description".into(),
                Json::from(engine.render(description, ctx)?),
            );
        }

        Ok(Json::Object(schema))
    }

    /// Parse a submitted response mapping into locator assignments.
    ///
    /// Fields with `set=null` are validated but omitted from the result.
    /// All field failures are collected into one `InvalidInput` error.
    pub fn parse_responses(
        &self,
        responses: &Map<String, Json>,
    ) -> Result<Vec<(Locator, Json)>> {
        let mut values = Vec::new();
        let mut errors = Vec::new();

        for (i, field) in self.fields.iter().enumerate() {
            let name = field_name(i);
            match field.parse(responses.get(&name)) {
                Ok(value) => {
                    if let Some(locator) = field.set() {
                        values.push((locator.clone(), value));
                    }
                }
                Err(msg) => errors.push(InputError { loc: name, msg }),
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(InterviewError::InvalidInput(errors))
        }
    }
}
