//! Question definitions: the tagged variant model plus rendering and
//! submission metadata.
//!
//! A `Question` carries the fields common to every question type; the
//! type-specific payload lives in [`QuestionKind`], a serde-tagged enum
//! keyed by `questionType`. Matching on `QuestionKind` is exhaustive, so
//! new question types cannot be silently ignored by consumers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use std::fmt;

/// The concrete rendering control for a question.
///
/// Each [`QuestionKind`] admits a fixed subset of input types; the schema
/// repairer replaces anything outside that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    Radio,
    Dropdown,
    Checkbox,
    MultiSelectDropdown,
    TextInput,
    Textarea,
    DatePicker,
    Star,
    LinearScale,
    LikertGrid,
    AddressBlock,
    RankOrder,
    FileUpload,
}

impl InputType {
    /// The camelCase wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Radio => "radio",
            InputType::Dropdown => "dropdown",
            InputType::Checkbox => "checkbox",
            InputType::MultiSelectDropdown => "multiSelectDropdown",
            InputType::TextInput => "textInput",
            InputType::Textarea => "textarea",
            InputType::DatePicker => "datePicker",
            InputType::Star => "star",
            InputType::LinearScale => "linearScale",
            InputType::LikertGrid => "likertGrid",
            InputType::AddressBlock => "addressBlock",
            InputType::RankOrder => "rankOrder",
            InputType::FileUpload => "fileUpload",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a filled-in answer advances the respondent to the next question.
///
/// - `AutoAnswer`: a single interaction fully answers the question
///   (radio click, date pick, star tap).
/// - `ManualAnswer`: the answer is complete only when the respondent says
///   so (multi-select, multi-field controls).
/// - `ManualUnclear`: free text; completeness cannot be inferred at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionBehavior {
    AutoAnswer,
    ManualAnswer,
    ManualUnclear,
}

impl SubmissionBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionBehavior::AutoAnswer => "autoAnswer",
            SubmissionBehavior::ManualAnswer => "manualAnswer",
            SubmissionBehavior::ManualUnclear => "manualUnclear",
        }
    }
}

impl fmt::Display for SubmissionBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rendering descriptor: which control to draw and which chrome to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDescriptor {
    pub input_type: InputType,
    #[serde(default = "default_true")]
    pub show_title: bool,
    #[serde(default = "default_true")]
    pub show_description: bool,
}

fn default_true() -> bool {
    true
}

impl DisplayDescriptor {
    /// A descriptor with default chrome for the given control.
    pub fn for_input(input_type: InputType) -> Self {
        Self {
            input_type,
            show_title: true,
            show_description: true,
        }
    }
}

/// Validation rules applied when a respondent submits an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Comparison operator for conditional visibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum LogicOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// A conditional-logic expression gating question visibility on another
/// question's answer. Stored as data; evaluation happens at render time,
/// outside this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalLogic {
    /// The id of the question whose answer is inspected.
    pub question_id: String,
    pub operator: LogicOperator,
    pub value: serde_json::Value,
}

/// One selectable option for choice and ranking questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Type-specific question payload, tagged by `questionType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "questionType", rename_all = "camelCase")]
pub enum QuestionKind {
    #[serde(rename_all = "camelCase")]
    SingleChoice { options: Vec<ChoiceOption> },

    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        options: Vec<ChoiceOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_selections: Option<u32>,
    },

    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default)]
        multiline: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Date {
        #[serde(default)]
        include_time: bool,
    },

    #[serde(rename_all = "camelCase")]
    Rating {
        #[serde(default = "default_rating_max")]
        max: u8,
    },

    #[serde(rename_all = "camelCase")]
    LinearScale {
        min: i32,
        max: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_label: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    LikertScale {
        statements: Vec<String>,
        scale_labels: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    Address {
        #[serde(default = "default_true")]
        include_line2: bool,
        #[serde(default)]
        include_country: bool,
    },

    #[serde(rename_all = "camelCase")]
    Ranking { options: Vec<ChoiceOption> },

    #[serde(rename_all = "camelCase")]
    FileUpload {
        #[serde(default = "default_max_files")]
        max_files: u8,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        allowed_extensions: Vec<String>,
    },
}

fn default_rating_max() -> u8 {
    5
}

fn default_max_files() -> u8 {
    1
}

impl QuestionKind {
    /// The camelCase `questionType` discriminant for this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "singleChoice",
            QuestionKind::MultipleChoice { .. } => "multipleChoice",
            QuestionKind::Text { .. } => "text",
            QuestionKind::Date { .. } => "date",
            QuestionKind::Rating { .. } => "rating",
            QuestionKind::LinearScale { .. } => "linearScale",
            QuestionKind::LikertScale { .. } => "likertScale",
            QuestionKind::Address { .. } => "address",
            QuestionKind::Ranking { .. } => "ranking",
            QuestionKind::FileUpload { .. } => "fileUpload",
        }
    }

    /// The option list, for the variants that carry one.
    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            QuestionKind::SingleChoice { options }
            | QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::Ranking { options } => Some(options),
            _ => None,
        }
    }
}

/// A single question within a form definition.
///
/// The type-specific payload is flattened so the wire shape reads as one
/// object with a `questionType` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display: DisplayDescriptor,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<ConditionalLogic>,
    pub submission_behavior: SubmissionBehavior,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question() -> Question {
        Question {
            id: "q1".to_string(),
            title: "Favorite color?".to_string(),
            description: None,
            display: DisplayDescriptor::for_input(InputType::Radio),
            validation: ValidationRules::default(),
            logic: None,
            submission_behavior: SubmissionBehavior::AutoAnswer,
            kind: QuestionKind::SingleChoice {
                options: vec![
                    ChoiceOption::new("o1", "Red"),
                    ChoiceOption::new("o2", "Blue"),
                ],
            },
        }
    }

    #[test]
    fn question_serializes_with_flattened_type_tag() {
        let q = choice_question();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["questionType"], "singleChoice");
        assert_eq!(json["id"], "q1");
        assert_eq!(json["display"]["inputType"], "radio");
        assert_eq!(json["submissionBehavior"], "autoAnswer");
        assert_eq!(json["options"][0]["label"], "Red");
    }

    #[test]
    fn question_roundtrips() {
        let q = choice_question();
        let json = serde_json::to_string(&q).unwrap();
        let parsed: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, q);
    }

    #[test]
    fn text_question_defaults() {
        let json = serde_json::json!({
            "id": "q2",
            "title": "Anything else?",
            "display": { "inputType": "textarea" },
            "submissionBehavior": "manualUnclear",
            "questionType": "text"
        });
        let q: Question = serde_json::from_value(json).unwrap();
        assert!(matches!(q.kind, QuestionKind::Text { multiline: false, .. }));
        assert!(q.display.show_title);
        assert!(!q.validation.required);
    }

    #[test]
    fn kind_type_name_covers_all_variants() {
        let kinds = [
            (QuestionKind::SingleChoice { options: vec![] }, "singleChoice"),
            (
                QuestionKind::MultipleChoice {
                    options: vec![],
                    max_selections: None,
                },
                "multipleChoice",
            ),
            (
                QuestionKind::Text {
                    multiline: false,
                    placeholder: None,
                },
                "text",
            ),
            (QuestionKind::Date { include_time: false }, "date"),
            (QuestionKind::Rating { max: 5 }, "rating"),
            (
                QuestionKind::LinearScale {
                    min: 1,
                    max: 10,
                    min_label: None,
                    max_label: None,
                },
                "linearScale",
            ),
            (
                QuestionKind::LikertScale {
                    statements: vec![],
                    scale_labels: vec![],
                },
                "likertScale",
            ),
            (
                QuestionKind::Address {
                    include_line2: true,
                    include_country: false,
                },
                "address",
            ),
            (QuestionKind::Ranking { options: vec![] }, "ranking"),
            (
                QuestionKind::FileUpload {
                    max_files: 1,
                    allowed_extensions: vec![],
                },
                "fileUpload",
            ),
        ];
        for (kind, expected) in kinds {
            assert_eq!(kind.type_name(), expected);
        }
    }

    #[test]
    fn options_accessor() {
        let q = choice_question();
        assert_eq!(q.kind.options().unwrap().len(), 2);

        let text = QuestionKind::Text {
            multiline: false,
            placeholder: None,
        };
        assert!(text.options().is_none());
    }

    #[test]
    fn conditional_logic_roundtrip() {
        let logic = ConditionalLogic {
            question_id: "q1".to_string(),
            operator: LogicOperator::Equals,
            value: serde_json::json!("o2"),
        };
        let json = serde_json::to_string(&logic).unwrap();
        assert!(json.contains("\"operator\":\"equals\""));
        let parsed: ConditionalLogic = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, logic);
    }

    #[test]
    fn input_type_display_matches_serde() {
        let json = serde_json::to_value(InputType::MultiSelectDropdown).unwrap();
        assert_eq!(json, InputType::MultiSelectDropdown.as_str());
    }
}
