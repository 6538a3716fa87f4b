//! Minor-update guard for published form versions.
//!
//! Once a version is published its schema is frozen: question count,
//! per-position ids, and per-position question types are immutable. Only
//! content fields (titles, descriptions, options' labels, validation,
//! settings) may change. Any structural drift is rejected with a message
//! naming the specific violation.

use formloom_types::error::GuardViolation;
use formloom_types::question::Question;

/// Validate a partial-update question list against the published one.
///
/// Checks run in order of severity: count first, then per-position id
/// (reordering), then per-position type. The first violation wins.
pub fn validate_minor_update(
    published: &[Question],
    incoming: &[Question],
) -> Result<(), GuardViolation> {
    if published.len() != incoming.len() {
        return Err(GuardViolation::QuestionCountChanged {
            expected: published.len(),
            actual: incoming.len(),
        });
    }

    for (position, (current, proposed)) in published.iter().zip(incoming).enumerate() {
        if current.id != proposed.id {
            return Err(GuardViolation::QuestionReordered {
                position,
                expected_id: current.id.clone(),
                actual_id: proposed.id.clone(),
            });
        }

        if current.kind.type_name() != proposed.kind.type_name() {
            return Err(GuardViolation::QuestionTypeChanged {
                id: current.id.clone(),
                expected: current.kind.type_name(),
                actual: proposed.kind.type_name(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formloom_types::question::{
        ChoiceOption, DisplayDescriptor, InputType, QuestionKind, SubmissionBehavior,
        ValidationRules,
    };

    fn question(id: &str, kind: QuestionKind, input: InputType) -> Question {
        Question {
            id: id.to_string(),
            title: format!("Question {id}"),
            description: None,
            display: DisplayDescriptor::for_input(input),
            validation: ValidationRules::default(),
            logic: None,
            submission_behavior: SubmissionBehavior::AutoAnswer,
            kind,
        }
    }

    fn published_five() -> Vec<Question> {
        (1..=5)
            .map(|i| {
                question(
                    &format!("q{i}"),
                    QuestionKind::SingleChoice {
                        options: vec![ChoiceOption::new("o1", "A"), ChoiceOption::new("o2", "B")],
                    },
                    InputType::Radio,
                )
            })
            .collect()
    }

    #[test]
    fn identical_lists_pass() {
        let published = published_five();
        assert!(validate_minor_update(&published, &published).is_ok());
    }

    #[test]
    fn content_only_change_passes() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming[2].title = "Reworded question".to_string();
        incoming[2].description = Some("Now with help text".to_string());
        assert!(validate_minor_update(&published, &incoming).is_ok());
    }

    #[test]
    fn removing_a_question_is_rejected_with_count_message() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming.remove(1);

        let err = validate_minor_update(&published, &incoming).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add or remove questions on a published form."
        );
    }

    #[test]
    fn adding_a_question_is_rejected() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming.push(question(
            "q6",
            QuestionKind::Text {
                multiline: false,
                placeholder: None,
            },
            InputType::TextInput,
        ));

        assert!(matches!(
            validate_minor_update(&published, &incoming),
            Err(GuardViolation::QuestionCountChanged {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[test]
    fn reordering_names_the_position() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming.swap(0, 3);

        let err = validate_minor_update(&published, &incoming).unwrap_err();
        match err {
            GuardViolation::QuestionReordered {
                position,
                expected_id,
                actual_id,
            } => {
                assert_eq!(position, 0);
                assert_eq!(expected_id, "q1");
                assert_eq!(actual_id, "q4");
            }
            other => panic!("expected QuestionReordered, got {other:?}"),
        }
    }

    #[test]
    fn type_change_names_the_question() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming[4].kind = QuestionKind::Text {
            multiline: false,
            placeholder: None,
        };

        let err = validate_minor_update(&published, &incoming).unwrap_err();
        assert!(err.to_string().contains("'q5'"));
        assert!(matches!(
            err,
            GuardViolation::QuestionTypeChanged {
                expected: "singleChoice",
                actual: "text",
                ..
            }
        ));
    }

    #[test]
    fn count_violation_wins_over_type_change() {
        let published = published_five();
        let mut incoming = published.clone();
        incoming[0].kind = QuestionKind::Date { include_time: false };
        incoming.pop();

        assert!(matches!(
            validate_minor_update(&published, &incoming),
            Err(GuardViolation::QuestionCountChanged { .. })
        ));
    }
}
