//! Schema validator and repairer.
//!
//! Pure, deterministic functions over question definitions. Two rule
//! classes interact: the rendering control must fit the question type
//! (set membership, and for choice questions the option-count preference),
//! and the submission behavior must match the canonical mapping for the
//! (possibly just-repaired) control. Running both passes once reaches a
//! fixed point, because behavior derivation never changes the control.

use std::borrow::Cow;

use formloom_types::error::SchemaViolation;
use formloom_types::question::{InputType, Question, QuestionKind, SubmissionBehavior};

/// Option count at which choice questions switch from compact controls
/// (radio, checkbox) to dropdown-family controls.
pub const DROPDOWN_THRESHOLD: usize = 4;

/// The fixed set of rendering controls a question type may use.
pub fn allowed_input_types(kind: &QuestionKind) -> &'static [InputType] {
    match kind {
        QuestionKind::SingleChoice { .. } => &[InputType::Radio, InputType::Dropdown],
        QuestionKind::MultipleChoice { .. } => {
            &[InputType::Checkbox, InputType::MultiSelectDropdown]
        }
        QuestionKind::Text { .. } => &[InputType::TextInput, InputType::Textarea],
        QuestionKind::Date { .. } => &[InputType::DatePicker],
        QuestionKind::Rating { .. } => &[InputType::Star],
        QuestionKind::LinearScale { .. } => &[InputType::LinearScale],
        QuestionKind::LikertScale { .. } => &[InputType::LikertGrid],
        QuestionKind::Address { .. } => &[InputType::AddressBlock],
        QuestionKind::Ranking { .. } => &[InputType::RankOrder],
        QuestionKind::FileUpload { .. } => &[InputType::FileUpload],
    }
}

/// The replacement control used when the current one is disallowed.
///
/// Choice questions prefer compact controls below [`DROPDOWN_THRESHOLD`]
/// options and dropdown-family controls at or above it. Text questions
/// keep their multiline intent. Every other type has exactly one control.
pub fn preferred_input_type(kind: &QuestionKind) -> InputType {
    match kind {
        QuestionKind::SingleChoice { options } => {
            if options.len() >= DROPDOWN_THRESHOLD {
                InputType::Dropdown
            } else {
                InputType::Radio
            }
        }
        QuestionKind::MultipleChoice { options, .. } => {
            if options.len() >= DROPDOWN_THRESHOLD {
                InputType::MultiSelectDropdown
            } else {
                InputType::Checkbox
            }
        }
        QuestionKind::Text { multiline, .. } => {
            if *multiline {
                InputType::Textarea
            } else {
                InputType::TextInput
            }
        }
        QuestionKind::Date { .. } => InputType::DatePicker,
        QuestionKind::Rating { .. } => InputType::Star,
        QuestionKind::LinearScale { .. } => InputType::LinearScale,
        QuestionKind::LikertScale { .. } => InputType::LikertGrid,
        QuestionKind::Address { .. } => InputType::AddressBlock,
        QuestionKind::Ranking { .. } => InputType::RankOrder,
        QuestionKind::FileUpload { .. } => InputType::FileUpload,
    }
}

/// The canonical submission behavior for a rendering control.
pub fn canonical_behavior(input_type: InputType) -> SubmissionBehavior {
    match input_type {
        InputType::Radio
        | InputType::Dropdown
        | InputType::DatePicker
        | InputType::Star
        | InputType::LinearScale
        | InputType::FileUpload => SubmissionBehavior::AutoAnswer,

        InputType::Checkbox
        | InputType::MultiSelectDropdown
        | InputType::AddressBlock
        | InputType::RankOrder
        | InputType::LikertGrid => SubmissionBehavior::ManualAnswer,

        InputType::TextInput | InputType::Textarea => SubmissionBehavior::ManualUnclear,
    }
}

/// Whether the control is acceptable for the question as a whole.
///
/// For choice questions the option count picks the control: compact below
/// [`DROPDOWN_THRESHOLD`], dropdown-family at or above it. A compact
/// control on a long option list is a violation even though it belongs to
/// the type's allowed set. Every other type only requires set membership.
fn input_type_fits(question: &Question) -> bool {
    let input = question.display.input_type;
    match &question.kind {
        QuestionKind::SingleChoice { .. } | QuestionKind::MultipleChoice { .. } => {
            input == preferred_input_type(&question.kind)
        }
        _ => allowed_input_types(&question.kind).contains(&input),
    }
}

/// Check a question against the structural invariants without repairing.
pub fn validate(question: &Question) -> Result<(), SchemaViolation> {
    let input = question.display.input_type;

    if !input_type_fits(question) {
        return Err(SchemaViolation::DisallowedInputType {
            question_type: question.kind.type_name(),
            input_type: input,
        });
    }

    let expected = canonical_behavior(input);
    if question.submission_behavior != expected {
        return Err(SchemaViolation::BehaviorMismatch {
            input_type: input,
            expected,
            actual: question.submission_behavior,
        });
    }

    if let Some(options) = question.kind.options()
        && options.is_empty()
    {
        return Err(SchemaViolation::EmptyOptions {
            question_id: question.id.clone(),
        });
    }

    if let QuestionKind::LinearScale { min, max, .. } = &question.kind
        && min >= max
    {
        return Err(SchemaViolation::InvalidRange {
            min: *min,
            max: *max,
        });
    }

    Ok(())
}

/// Repair a question's rendering control and submission behavior.
///
/// Pass 1 replaces a disallowed control with the preferred one for the
/// question type; pass 2 re-derives the submission behavior from the
/// resulting control. Returns `Cow::Borrowed` when nothing needed repair,
/// so callers can detect change by identity without comparing fields.
///
/// Repair never touches content: an empty option list or inverted scale
/// range stays a [`validate`] error for the generation retry loop.
pub fn repair(question: &Question) -> Cow<'_, Question> {
    let mut input = question.display.input_type;
    let mut changed = false;

    if !input_type_fits(question) {
        input = preferred_input_type(&question.kind);
        changed = true;
    }

    let behavior = canonical_behavior(input);
    if behavior != question.submission_behavior {
        changed = true;
    }

    if !changed {
        return Cow::Borrowed(question);
    }

    let mut repaired = question.clone();
    repaired.display.input_type = input;
    repaired.submission_behavior = behavior;
    Cow::Owned(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formloom_types::question::{ChoiceOption, DisplayDescriptor, ValidationRules};

    fn question(kind: QuestionKind, input: InputType, behavior: SubmissionBehavior) -> Question {
        Question {
            id: "q1".to_string(),
            title: "Test".to_string(),
            description: None,
            display: DisplayDescriptor::for_input(input),
            validation: ValidationRules::default(),
            logic: None,
            submission_behavior: behavior,
            kind,
        }
    }

    fn options(n: usize) -> Vec<ChoiceOption> {
        (0..n)
            .map(|i| ChoiceOption::new(format!("o{i}"), format!("Option {i}")))
            .collect()
    }

    #[test]
    fn valid_question_returns_borrowed() {
        let q = question(
            QuestionKind::SingleChoice { options: options(2) },
            InputType::Radio,
            SubmissionBehavior::AutoAnswer,
        );
        let repaired = repair(&q);
        assert!(matches!(repaired, Cow::Borrowed(_)));
        assert_eq!(*repaired, q);
    }

    #[test]
    fn five_option_multiple_choice_checkbox_becomes_multi_select_dropdown() {
        // A checkbox belongs to the multipleChoice set, but at 5 options
        // the dropdown family is required; both passes fire.
        let q = question(
            QuestionKind::MultipleChoice {
                options: options(5),
                max_selections: None,
            },
            InputType::Checkbox,
            SubmissionBehavior::AutoAnswer,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::MultiSelectDropdown);
        assert_eq!(repaired.submission_behavior, SubmissionBehavior::ManualAnswer);
    }

    #[test]
    fn checkbox_below_threshold_keeps_control_but_fixes_behavior() {
        // With 3 options checkbox is the preferred control; repair only
        // re-derives the behavior.
        let q = question(
            QuestionKind::MultipleChoice {
                options: options(3),
                max_selections: None,
            },
            InputType::Checkbox,
            SubmissionBehavior::AutoAnswer,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::Checkbox);
        assert_eq!(repaired.submission_behavior, SubmissionBehavior::ManualAnswer);
    }

    #[test]
    fn dropdown_below_threshold_prefers_radio() {
        let q = question(
            QuestionKind::SingleChoice { options: options(2) },
            InputType::Dropdown,
            SubmissionBehavior::AutoAnswer,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::Radio);
    }

    #[test]
    fn disallowed_control_on_small_single_choice_becomes_radio() {
        let q = question(
            QuestionKind::SingleChoice { options: options(3) },
            InputType::Checkbox,
            SubmissionBehavior::ManualAnswer,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::Radio);
        assert_eq!(repaired.submission_behavior, SubmissionBehavior::AutoAnswer);
    }

    #[test]
    fn disallowed_control_on_large_single_choice_becomes_dropdown() {
        let q = question(
            QuestionKind::SingleChoice { options: options(6) },
            InputType::Textarea,
            SubmissionBehavior::ManualUnclear,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::Dropdown);
        assert_eq!(repaired.submission_behavior, SubmissionBehavior::AutoAnswer);
    }

    #[test]
    fn multiline_text_prefers_textarea() {
        let q = question(
            QuestionKind::Text {
                multiline: true,
                placeholder: None,
            },
            InputType::Radio,
            SubmissionBehavior::AutoAnswer,
        );
        let repaired = repair(&q);
        assert_eq!(repaired.display.input_type, InputType::Textarea);
        assert_eq!(repaired.submission_behavior, SubmissionBehavior::ManualUnclear);
    }

    #[test]
    fn repair_is_sound_for_every_kind() {
        // Start each kind from a deliberately wrong control and behavior;
        // after repair the control must be allowed and the behavior
        // canonical. Running repair twice must be a no-op (fixed point).
        let kinds = vec![
            QuestionKind::SingleChoice { options: options(2) },
            QuestionKind::SingleChoice { options: options(7) },
            QuestionKind::MultipleChoice {
                options: options(2),
                max_selections: None,
            },
            QuestionKind::MultipleChoice {
                options: options(4),
                max_selections: Some(2),
            },
            QuestionKind::Text {
                multiline: false,
                placeholder: None,
            },
            QuestionKind::Text {
                multiline: true,
                placeholder: None,
            },
            QuestionKind::Date { include_time: false },
            QuestionKind::Rating { max: 5 },
            QuestionKind::LinearScale {
                min: 1,
                max: 10,
                min_label: None,
                max_label: None,
            },
            QuestionKind::LikertScale {
                statements: vec!["I like it".to_string()],
                scale_labels: vec!["No".to_string(), "Yes".to_string()],
            },
            QuestionKind::Address {
                include_line2: true,
                include_country: false,
            },
            QuestionKind::Ranking { options: options(3) },
            QuestionKind::FileUpload {
                max_files: 1,
                allowed_extensions: vec![],
            },
        ];

        for kind in kinds {
            let q = question(kind, InputType::FileUpload, SubmissionBehavior::ManualUnclear);
            let repaired = repair(&q).into_owned();

            assert!(
                allowed_input_types(&repaired.kind).contains(&repaired.display.input_type),
                "control {} not allowed for {}",
                repaired.display.input_type,
                repaired.kind.type_name()
            );
            assert_eq!(
                repaired.submission_behavior,
                canonical_behavior(repaired.display.input_type),
                "behavior not canonical for {}",
                repaired.kind.type_name()
            );

            // Fixed point: a second repair changes nothing.
            let again = repair(&repaired);
            assert!(matches!(again, Cow::Borrowed(_)));
        }
    }

    #[test]
    fn validate_rejects_empty_options() {
        let q = question(
            QuestionKind::Ranking { options: vec![] },
            InputType::RankOrder,
            SubmissionBehavior::ManualAnswer,
        );
        let err = validate(&q).unwrap_err();
        assert!(matches!(err, SchemaViolation::EmptyOptions { .. }));
        // Repair does not invent options; the violation persists.
        let repaired = repair(&q);
        assert!(validate(&repaired).is_err());
    }

    #[test]
    fn validate_rejects_inverted_scale() {
        let q = question(
            QuestionKind::LinearScale {
                min: 10,
                max: 1,
                min_label: None,
                max_label: None,
            },
            InputType::LinearScale,
            SubmissionBehavior::AutoAnswer,
        );
        assert!(matches!(
            validate(&q),
            Err(SchemaViolation::InvalidRange { min: 10, max: 1 })
        ));
    }

    #[test]
    fn validate_reports_behavior_mismatch() {
        let q = question(
            QuestionKind::Date { include_time: false },
            InputType::DatePicker,
            SubmissionBehavior::ManualUnclear,
        );
        assert!(matches!(
            validate(&q),
            Err(SchemaViolation::BehaviorMismatch {
                expected: SubmissionBehavior::AutoAnswer,
                ..
            })
        ));
    }

    #[test]
    fn canonical_behavior_table() {
        use InputType::*;
        use SubmissionBehavior::*;
        let cases = [
            (Radio, AutoAnswer),
            (Dropdown, AutoAnswer),
            (DatePicker, AutoAnswer),
            (Star, AutoAnswer),
            (LinearScale, AutoAnswer),
            (FileUpload, AutoAnswer),
            (Checkbox, ManualAnswer),
            (MultiSelectDropdown, ManualAnswer),
            (AddressBlock, ManualAnswer),
            (RankOrder, ManualAnswer),
            (LikertGrid, ManualAnswer),
            (TextInput, ManualUnclear),
            (Textarea, ManualUnclear),
        ];
        for (input, expected) in cases {
            assert_eq!(canonical_behavior(input), expected, "for {input}");
        }
    }
}
