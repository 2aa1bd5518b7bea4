//! Interview definitions: questions plus an ordered step program.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, Result};
use crate::question::Question;
use crate::step::Step;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    /// The interview ID.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The available questions, in declared order.
    #[serde(default)]
    pub questions: Vec<Question>,

    /// The steps.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Interview {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Check config invariants: valid identifiers, unique question ids,
    /// resolvable `ask` references.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.id) {
            return Err(InterviewError::Misconfigured(format!(
                "invalid interview id: {:?}",
                self.id
            )));
        }

        let mut seen = BTreeSet::new();
        for question in &self.questions {
            if !is_identifier(&question.id) {
                return Err(InterviewError::Misconfigured(format!(
                    "invalid question id: {:?}",
                    question.id
                )));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(InterviewError::Misconfigured(format!(
                    "duplicate question id: {:?}",
                    question.id
                )));
            }
        }

        validate_asks(&self.steps, &seen)
    }
}

fn validate_asks(steps: &[Step], question_ids: &BTreeSet<&str>) -> Result<()> {
    for step in steps {
        match step {
            Step::Ask(ask) => {
                if !question_ids.contains(ask.ask.as_str()) {
                    return Err(InterviewError::Misconfigured(format!(
                        "ask references unknown question id: {:?}",
                        ask.ask
                    )));
                }
            }
            Step::Block(block) => validate_asks(&block.block, question_ids)?,
            _ => {}
        }
    }
    Ok(())
}

/// Whether a string is a valid identifier: starts with a letter, contains
/// only letters, digits, `_`, or `-`, and does not end with `-`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !value.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rules() {
        for ok in ["a", "q1", "set-a-1", "a_b", "A-b_2"] {
            assert!(is_identifier(ok), "{ok:?} should be valid");
        }
        for bad in ["", "0q", "_q", "-q", "q-", "q q", "q."] {
            assert!(!is_identifier(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn parses_interview_yaml() {
        let interviews: Vec<Interview> = serde_yaml::from_str(
            "
- id: int1
  questions:
    - id: q1
      fields:
        - set: name
          type: text
          label: Name
  steps:
    - ask: q1
",
        )
        .unwrap();
        assert_eq!(interviews.len(), 1);
        let interview = &interviews[0];
        assert_eq!(interview.id, "int1");
        assert!(interview.question("q1").is_some());
        interview.validate().unwrap();
    }

    #[test]
    fn validate_rejects_unknown_ask() {
        let interview: Interview = serde_yaml::from_str(
            "
id: int1
steps:
  - ask: missing
",
        )
        .unwrap();
        assert!(matches!(
            interview.validate(),
            Err(InterviewError::Misconfigured(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_question_ids() {
        let interview: Interview = serde_yaml::from_str(
            "
id: int1
questions:
  - id: q1
  - id: q1
",
        )
        .unwrap();
        assert!(matches!(
            interview.validate(),
            Err(InterviewError::Misconfigured(_))
        ));
    }
}
