//! Selecting a question to provide an undefined variable.

use serde_json::Value as Json;

use crate::error::{InterviewError, Result};
use crate::locator::Locator;
use crate::run::Runner;
use crate::state::InterviewState;

/// Bound on recursion through `when`/schema undefineds. Exceeding it means
/// the question dependencies form a cycle.
const MAX_RESOLVE_DEPTH: usize = 64;

/// Find the first unanswered, `when`-satisfied question providing `loc`,
/// and render its schema.
///
/// If evaluating a guard or rendering the schema hits another undefined
/// variable, resolution restarts on that variable instead.
pub fn question_schema_for(
    runner: &Runner,
    state: &InterviewState,
    loc: &Locator,
) -> Result<(String, Json)> {
    let mut loc = loc.clone();
    for _ in 0..MAX_RESOLVE_DEPTH {
        match resolve_once(runner, state, &loc) {
            Ok(found) => return Ok(found),
            Err(InterviewError::Undefined(inner)) => loc = inner,
            Err(other) => return Err(other),
        }
    }
    Err(InterviewError::Misconfigured(format!(
        "could not resolve a question for {loc}: dependency cycle"
    )))
}

fn resolve_once(runner: &Runner, state: &InterviewState, loc: &Locator) -> Result<(String, Json)> {
    let ctx = state.template_context();

    for question in &state.interview.questions {
        if state.answered_question_ids.contains(&question.id) {
            continue;
        }
        if !question.when.evaluate(runner.engine(), &ctx)? {
            continue;
        }
        let provides = question
            .fields
            .iter()
            .filter_map(|field| field.set())
            .any(|target| target.compare(loc, &ctx));
        if !provides {
            continue;
        }

        let schema = question.schema(runner.engine(), &ctx)?;
        return Ok((question.id.clone(), schema));
    }

    Err(InterviewError::Misconfigured(format!(
        "no question provides {loc}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::Interview;
    use crate::locator::{parse_locator, Context};
    use serde_json::json;

    fn ctx(value: Json) -> Context {
        match value {
            Json::Object(map) => map,
            _ => panic!("context fixture must be an object"),
        }
    }

    fn branching_interview() -> Interview {
        serde_yaml::from_str(
            "
id: int1
questions:
  - id: set-a-1
    when: use_a1
    fields:
      - type: text
        set: a
  - id: set-a-2
    when: [use_a1 == false, use_a2]
    fields:
      - type: text
        set: a
",
        )
        .unwrap()
    }

    #[test]
    fn picks_first_question_matching_conditions() {
        let runner = Runner::new();
        let interview = branching_interview();
        let loc = parse_locator("a").unwrap();

        let state = InterviewState::new(interview.clone())
            .with_data(ctx(json!({"use_a1": true, "use_a2": true})));
        let (id, _) = question_schema_for(&runner, &state, &loc).unwrap();
        assert_eq!(id, "set-a-1");

        let state = InterviewState::new(interview)
            .with_data(ctx(json!({"use_a1": false, "use_a2": true})));
        let (id, schema) = question_schema_for(&runner, &state, &loc).unwrap();
        assert_eq!(id, "set-a-2");
        assert_eq!(schema["required"], json!(["field_0"]));
    }

    #[test]
    fn skips_answered_questions() {
        let runner = Runner::new();
        let state = InterviewState::new(branching_interview())
            .with_data(ctx(json!({"use_a1": true, "use_a2": true})))
            .set_question("set-a-1".into());
        let loc = parse_locator("a").unwrap();
        // set-a-1 is answered; set-a-2's conditions fail (use_a1 is true)
        assert!(matches!(
            question_schema_for(&runner, &state, &loc),
            Err(InterviewError::Misconfigured(_))
        ));
    }

    #[test]
    fn recurses_on_undefined_guard_variable() {
        let runner = Runner::new();
        let interview: Interview = serde_yaml::from_str(
            "
id: int1
questions:
  - id: ask-flag
    fields:
      - type: text
        set: use_a1
  - id: set-a
    when: use_a1
    fields:
      - type: text
        set: a
",
        )
        .unwrap();
        let state = InterviewState::new(interview);
        let loc = parse_locator("a").unwrap();
        // resolving `a` first needs `use_a1`, provided by ask-flag
        let (id, _) = question_schema_for(&runner, &state, &loc).unwrap();
        assert_eq!(id, "ask-flag");
    }

    #[test]
    fn recurses_on_undefined_schema_template() {
        let runner = Runner::new();
        let interview: Interview = serde_yaml::from_str(
            "
id: int1
questions:
  - id: ask-b
    fields:
      - type: text
        set: b
  - id: ask-c
    fields:
      - type: text
        set: c
        label: 'B is: {{ b }}'
",
        )
        .unwrap();
        let state = InterviewState::new(interview);
        let loc = parse_locator("c").unwrap();
        // ask-c's label depends on `b`, so the question for `b` surfaces first
        let (id, _) = question_schema_for(&runner, &state, &loc).unwrap();
        assert_eq!(id, "ask-b");
    }

    #[test]
    fn no_provider_is_a_config_error() {
        let runner = Runner::new();
        let state = InterviewState::new(serde_yaml::from_str("id: int1").unwrap());
        let loc = parse_locator("nothing").unwrap();
        let err = question_schema_for(&runner, &state, &loc).unwrap_err();
        match err {
            InterviewError::Misconfigured(msg) => assert!(msg.contains("nothing")),
            other => panic!("expected misconfigured, got {other:?}"),
        }
    }

    #[test]
    fn parametric_set_over_missing_variable_is_skipped() {
        let runner = Runner::new();
        let interview: Interview = serde_yaml::from_str(
            "
id: int1
questions:
  - id: q-param
    fields:
      - type: text
        set: a[n]
",
        )
        .unwrap();
        let state = InterviewState::new(interview).with_data(ctx(json!({"a": {"x": 1}})));
        // `n` is undefined, so the reduction fails and q-param cannot be
        // selected to provide `a.x`
        let loc = parse_locator("a.x").unwrap();
        assert!(matches!(
            question_schema_for(&runner, &state, &loc),
            Err(InterviewError::Misconfigured(_))
        ));
    }
}
