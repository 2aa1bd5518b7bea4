//! Variable locators.
//!
//! A locator is a parsed path into the interview data tree, like `a.b[0]` or
//! `person[attr]`. Locators are evaluated against the merged template
//! context, assigned through into the mutable `data` tree, and compared
//! structurally (parametric indices are reduced against the context first).

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, take_while1},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, opt, value},
    error::{convert_error, ErrorKind, ParseError as NomParseError, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{InterviewError, Result};

/// The dynamic value tree locators operate on: `data`, `context`, or the
/// merged template context.
pub type Context = Map<String, Value>;

/// A concrete index key: a string property or a list position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Str(String),
    Int(u64),
}

impl Key {
    pub fn to_json(&self) -> Value {
        match self {
            Key::Str(s) => Value::String(s.clone()),
            Key::Int(i) => Value::from(*i),
        }
    }
}

/// A variable locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A top-level variable.
    Variable { name: String },
    /// An index/property access with a concrete key, like `a.b` or `a[0]`.
    Index { target: Box<Locator>, key: Key },
    /// An index access whose key is itself a locator, like `a[n]`.
    Param { target: Box<Locator>, index: Box<Locator> },
    /// A literal value. Only appears inside an index; never assignable.
    Literal { value: Key },
}

impl Locator {
    /// Return the value at this locator.
    ///
    /// The error for a missing key carries the deepest resolvable path that
    /// failed, e.g. evaluating `a.b.c` against `{"a": {}}` reports `a.b`.
    pub fn evaluate(&self, ctx: &Context) -> Result<Value> {
        match self {
            Locator::Literal { value } => Ok(value.to_json()),
            Locator::Variable { name } => ctx
                .get(name)
                .cloned()
                .ok_or_else(|| InterviewError::Undefined(self.clone())),
            Locator::Index { target, key } => {
                let parent = target.evaluate(ctx)?;
                self.index_into(&parent, key)
            }
            Locator::Param { .. } => self.reduce(ctx)?.evaluate(ctx),
        }
    }

    fn index_into(&self, parent: &Value, key: &Key) -> Result<Value> {
        match (parent, key) {
            (Value::Object(map), Key::Str(s)) => map
                .get(s)
                .cloned()
                .ok_or_else(|| InterviewError::Undefined(self.clone())),
            (Value::Object(_), Key::Int(_)) => Err(InterviewError::Undefined(self.clone())),
            (Value::Array(items), Key::Int(i)) => items
                .get(*i as usize)
                .cloned()
                .ok_or_else(|| InterviewError::Undefined(self.clone())),
            (Value::Array(_), Key::Str(s)) => Err(InterviewError::Misconfigured(format!(
                "cannot index a list with {s:?}"
            ))),
            (other, _) => Err(InterviewError::Misconfigured(format!(
                "not a list or object: {other}"
            ))),
        }
    }

    /// Normalize every `Param` in this locator to a concrete `Index` by
    /// evaluating its inner locator against `ctx`.
    pub fn reduce(&self, ctx: &Context) -> Result<Locator> {
        match self {
            Locator::Variable { .. } | Locator::Literal { .. } => Ok(self.clone()),
            Locator::Index { target, key } => Ok(Locator::Index {
                target: Box::new(target.reduce(ctx)?),
                key: key.clone(),
            }),
            Locator::Param { target, index } => {
                let key = match index.evaluate(ctx)? {
                    Value::String(s) => Key::Str(s),
                    Value::Number(n) => match n.as_u64() {
                        Some(i) => Key::Int(i),
                        None => {
                            return Err(InterviewError::Misconfigured(format!(
                                "not a valid index: {n}"
                            )))
                        }
                    },
                    other => {
                        return Err(InterviewError::Misconfigured(format!(
                            "not a valid index: {other}"
                        )))
                    }
                };
                Ok(Locator::Index {
                    target: Box::new(target.reduce(ctx)?),
                    key,
                })
            }
        }
    }

    /// Set the value at this locator.
    ///
    /// The target prefix must already exist and be indexable; collections
    /// are not auto-created. Only top-level variables may be inserted fresh.
    pub fn set(&self, value: Value, data: &mut Context) -> Result<()> {
        match self {
            Locator::Literal { .. } => Err(InterviewError::Misconfigured(
                "cannot assign to a literal".into(),
            )),
            Locator::Variable { name } => {
                data.insert(name.clone(), value);
                Ok(())
            }
            Locator::Index { target, key } => {
                let slot = target.locate_mut(data)?;
                assign_key(slot, key, value)
            }
            Locator::Param { .. } => {
                let reduced = self.reduce(&*data)?;
                reduced.set(value, data)
            }
        }
    }

    fn locate_mut<'a>(&self, data: &'a mut Context) -> Result<&'a mut Value> {
        match self {
            Locator::Literal { .. } => Err(InterviewError::Misconfigured(
                "cannot assign through a literal".into(),
            )),
            Locator::Variable { name } => data
                .get_mut(name)
                .ok_or_else(|| InterviewError::Undefined(self.clone())),
            Locator::Index { target, key } => {
                let parent = target.locate_mut(data)?;
                match parent {
                    Value::Object(map) => match key {
                        Key::Str(s) => map
                            .get_mut(s)
                            .ok_or_else(|| InterviewError::Undefined(self.clone())),
                        Key::Int(_) => Err(InterviewError::Undefined(self.clone())),
                    },
                    Value::Array(items) => match key {
                        Key::Int(i) => items
                            .get_mut(*i as usize)
                            .ok_or_else(|| InterviewError::Undefined(self.clone())),
                        Key::Str(s) => Err(InterviewError::Misconfigured(format!(
                            "cannot index a list with {s:?}"
                        ))),
                    },
                    other => Err(InterviewError::Misconfigured(format!(
                        "not a list or object: {other}"
                    ))),
                }
            }
            Locator::Param { .. } => {
                let reduced = self.reduce(&*data)?;
                reduced.locate_mut(data)
            }
        }
    }

    /// Whether two locators refer to the same location under `ctx`.
    ///
    /// Both sides are reduced first; equality is then structural. If either
    /// reduction fails (an undefined or non-scalar parametric index), the
    /// locators are considered unequal. A consequence: a question whose
    /// `set` target is parametrized over a missing variable will not be
    /// selected to provide that variable.
    pub fn compare(&self, other: &Locator, ctx: &Context) -> bool {
        match (self.reduce(ctx), other.reduce(ctx)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn assign_key(slot: &mut Value, key: &Key, value: Value) -> Result<()> {
    match slot {
        Value::Object(map) => match key {
            Key::Str(s) => {
                map.insert(s.clone(), value);
                Ok(())
            }
            Key::Int(i) => Err(InterviewError::Misconfigured(format!(
                "cannot use {i} as an object key"
            ))),
        },
        Value::Array(items) => match key {
            Key::Int(i) => match items.get_mut(*i as usize) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(InterviewError::Misconfigured(format!(
                    "list index out of range: {i}"
                ))),
            },
            Key::Str(s) => Err(InterviewError::Misconfigured(format!(
                "cannot index a list with {s:?}"
            ))),
        },
        other => Err(InterviewError::Misconfigured(format!(
            "not a list or object: {other}"
        ))),
    }
}

// ─── Printing ─────────────────────────────────────────────────

fn is_plain_key(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Variable { name } => f.write_str(name),
            Locator::Index { target, key } => {
                write!(f, "{target}")?;
                match key {
                    Key::Str(s) if is_plain_key(s) => write!(f, ".{s}"),
                    Key::Str(s) => write!(f, "[\"{}\"]", escape_str(s)),
                    Key::Int(i) => write!(f, "[{i}]"),
                }
            }
            Locator::Param { target, index } => write!(f, "{target}[{index}]"),
            Locator::Literal { value } => match value {
                Key::Str(s) => write!(f, "\"{}\"", escape_str(s)),
                Key::Int(i) => write!(f, "{i}"),
            },
        }
    }
}

// ─── Parsing ──────────────────────────────────────────────────

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

enum Segment {
    Prop(String),
    Lit(Key),
    Param(Locator),
}

fn name(input: &str) -> PResult<&str> {
    let (rest, word) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)?;
    let starts_ok = word
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_ok || word.ends_with('-') {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        )));
    }
    Ok((rest, word))
}

fn int_lit(input: &str) -> PResult<Key> {
    let (rest, digits) = digit1(input)?;
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        )));
    }
    match digits.parse::<u64>() {
        Ok(n) => Ok((rest, Key::Int(n))),
        Err(_) => Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        ))),
    }
}

fn string_lit(input: &str) -> PResult<Key> {
    let (rest, text) = delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value('"', char('"')), value('\\', char('\\')))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)?;
    Ok((rest, Key::Str(text)))
}

fn segment(input: &str) -> PResult<Segment> {
    alt((
        map(preceded(char('.'), name), |s| Segment::Prop(s.to_string())),
        delimited(
            pair(char('['), multispace0),
            alt((
                map(alt((string_lit, int_lit)), Segment::Lit),
                map(locator_expr, Segment::Param),
            )),
            pair(multispace0, char(']')),
        ),
    ))(input)
}

fn locator_expr(input: &str) -> PResult<Locator> {
    let (input, first) = name(input)?;
    let (input, segments) = many0(segment)(input)?;
    let locator = segments.into_iter().fold(
        Locator::Variable {
            name: first.to_string(),
        },
        |target, seg| match seg {
            Segment::Prop(s) => Locator::Index {
                target: Box::new(target),
                key: Key::Str(s),
            },
            Segment::Lit(key) => Locator::Index {
                target: Box::new(target),
                key,
            },
            Segment::Param(index) => Locator::Param {
                target: Box::new(target),
                index: Box::new(index),
            },
        },
    );
    Ok((input, locator))
}

/// Parse a [`Locator`] from a string.
pub fn parse_locator(input: &str) -> Result<Locator> {
    let trimmed = input.trim();
    match all_consuming(locator_expr)(trimmed) {
        Ok((_, locator)) => Ok(locator),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(
            InterviewError::InvalidLocator(convert_error(trimmed, e)),
        ),
        Err(nom::Err::Incomplete(_)) => {
            Err(InterviewError::InvalidLocator("incomplete input".into()))
        }
    }
}

impl FromStr for Locator {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self> {
        parse_locator(s)
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_locator(&raw).map_err(de::Error::custom)
    }
}
