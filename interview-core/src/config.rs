//! Loading interview bundles and keys.

use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::Deserialize;

use crate::error::{InterviewError, Result};
use crate::interview::Interview;
use crate::question::Question;
use crate::step::Step;

/// One entry of the interview bundle file.
#[derive(Debug, Deserialize)]
struct InterviewConfigEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    questions: Vec<QuestionSource>,
    #[serde(default)]
    steps: Vec<Step>,
}

/// A question inline in the bundle, or a path to a file holding a sequence
/// of questions (resolved relative to the bundle file).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionSource {
    Inline(Box<Question>),
    Path(String),
}

/// The loaded interview configuration, indexed by id.
#[derive(Debug, Default)]
pub struct InterviewConfig {
    interviews: BTreeMap<String, Interview>,
}

impl InterviewConfig {
    /// Load interviews from a YAML bundle file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error(path, e))?;
        let entries: Vec<InterviewConfigEntry> =
            serde_yaml::from_str(&text).map_err(|e| config_error(path, e))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut interviews = BTreeMap::new();
        for entry in entries {
            let mut questions = Vec::new();
            for source in entry.questions {
                match source {
                    QuestionSource::Inline(question) => questions.push(*question),
                    QuestionSource::Path(rel) => {
                        questions.extend(load_question_file(&base.join(rel))?)
                    }
                }
            }

            let interview = Interview {
                id: entry.id,
                title: entry.title,
                questions,
                steps: entry.steps,
            };
            interview.validate()?;

            if interviews.contains_key(&interview.id) {
                return Err(InterviewError::Misconfigured(format!(
                    "duplicate interview id: {:?}",
                    interview.id
                )));
            }
            tracing::debug!(id = %interview.id, "loaded interview");
            interviews.insert(interview.id.clone(), interview);
        }

        Ok(Self { interviews })
    }

    pub fn from_interviews(interviews: impl IntoIterator<Item = Interview>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for interview in interviews {
            interview.validate()?;
            map.insert(interview.id.clone(), interview);
        }
        Ok(Self { interviews: map })
    }

    pub fn get(&self, id: &str) -> Option<&Interview> {
        self.interviews.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Interview)> {
        self.interviews.iter().map(|(id, i)| (id.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.interviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interviews.is_empty()
    }
}

fn load_question_file(path: &Path) -> Result<Vec<Question>> {
    let text = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| config_error(path, e))
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> InterviewError {
    InterviewError::Misconfigured(format!("failed to load {}: {err}", path.display()))
}

/// Decode a base64url-encoded 32-byte encryption key.
pub fn decode_encryption_key(value: &str) -> Result<[u8; 32]> {
    let trimmed = value.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| URL_SAFE.decode(trimmed))
        .map_err(|e| InterviewError::Misconfigured(format!("invalid encryption key: {e}")))?;
    <[u8; 32]>::try_from(bytes).map_err(|bytes| {
        InterviewError::Misconfigured(format!(
            "encryption key must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}
