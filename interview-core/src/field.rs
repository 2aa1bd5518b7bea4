//! Input fields.
//!
//! A field validates one submitted value and emits one JSON-schema
//! fragment. Validation order: conversion (trim, coerce empty to null),
//! the `optional` check, the type check, then kind-specific constraints.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::Result;
use crate::fields::button::ButtonField;
use crate::fields::date::DateField;
use crate::fields::number::NumberField;
use crate::fields::select::SelectField;
use crate::fields::text::TextField;
use crate::locator::{Context, Locator};
use crate::template::TemplateEngine;

/// A typed input field, dispatched by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Field {
    Text(TextField),
    Number(NumberField),
    Date(DateField),
    Select(SelectField),
    Button(ButtonField),
}

impl Field {
    /// The variable location the parsed value is written to. `None` means
    /// the value is collected but discarded.
    pub fn set(&self) -> Option<&Locator> {
        match self {
            Field::Text(f) => f.set.as_ref(),
            Field::Number(f) => f.set.as_ref(),
            Field::Date(f) => f.set.as_ref(),
            Field::Select(f) => f.set.as_ref(),
            Field::Button(f) => f.set.as_ref(),
        }
    }

    /// Whether a null value is accepted.
    pub fn optional(&self) -> bool {
        match self {
            Field::Text(f) => f.optional,
            Field::Number(f) => f.optional,
            Field::Date(f) => f.optional,
            Field::Select(f) => f.optional(),
            Field::Button(_) => false,
        }
    }

    /// Validate and convert a submitted value.
    pub fn parse(&self, value: Option<&Json>) -> std::result::Result<Json, String> {
        match self {
            Field::Text(f) => f.parse(value),
            Field::Number(f) => f.parse(value),
            Field::Date(f) => f.parse(value),
            Field::Select(f) => f.parse(value),
            Field::Button(f) => f.parse(value),
        }
    }

    /// The JSON-schema fragment for this field, with templates rendered.
    pub fn schema(&self, engine: &TemplateEngine, ctx: &Context) -> Result<Json> {
        match self {
            Field::Text(f) => f.schema(engine, ctx),
            Field::Number(f) => f.schema(engine, ctx),
            Field::Date(f) => f.schema(engine, ctx),
            Field::Select(f) => f.schema(engine, ctx),
            Field::Button(f) => f.schema(engine, ctx),
        }
    }
}

/// Treat a missing value and an explicit null the same.
pub(crate) fn normalize(value: Option<&Json>) -> Option<&Json> {
    match value {
        None | Some(Json::Null) => None,
        Some(other) => Some(other),
    }
}

pub(crate) const REQUIRED_MSG: &str = "a value is required";
