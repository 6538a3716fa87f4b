//! The updateForm tool executor.
//!
//! Applies add/update/remove actions to the conversation's draft version.
//! Every incoming question passes through the schema repairer before it
//! lands; content problems the repairer cannot fix are rejected back to
//! the model as invalid input. Published-only forms are out of this tool's
//! reach -- direct content edits to a published version go through the
//! minor-update API path.

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;

use formloom_types::agent::AgentStatus;
use formloom_types::error::{FormError, ToolError};
use formloom_types::event::EventPayload;
use formloom_types::form::VersionStatus;
use formloom_types::question::Question;

use crate::llm::LanguageModel;
use crate::repository::FormRepository;
use crate::schema::repair::{repair, validate};

use super::{ToolRuntime, emit_snapshot};

/// One mutation against the draft question list.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum QuestionAction {
    /// Insert a question, at `position` or at the end.
    #[serde(rename_all = "camelCase")]
    Add {
        question: Question,
        #[serde(default)]
        position: Option<usize>,
    },

    /// Replace the question with the same id.
    #[serde(rename_all = "camelCase")]
    Update { question: Question },

    /// Delete the question with this id.
    #[serde(rename_all = "camelCase")]
    Remove { question_id: String },
}

/// Input contract for the updateForm tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormInput {
    #[serde(default)]
    pub actions: Vec<QuestionAction>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Apply the actions to the draft and snapshot the result.
pub async fn run<R, M>(
    input: UpdateFormInput,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<serde_json::Value, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let form_id = runtime.events.form_id();

    let mut form = runtime
        .repo
        .get_form(&form_id)
        .await?
        .ok_or(FormError::NotFound)?;

    let mut version = match runtime
        .repo
        .get_version_by_status(&form_id, VersionStatus::Draft)
        .await?
    {
        Some(version) => version,
        None if form.current_published_version_id.is_some() => {
            return Err(ToolError::Form(FormError::NoDraft));
        }
        None => return Err(ToolError::Form(FormError::VersionNotFound)),
    };

    if let Some(title) = &input.title {
        version.title = title.clone();
    }
    if let Some(description) = &input.description {
        version.description = Some(description.clone());
    }

    for (index, action) in input.actions.into_iter().enumerate() {
        let label = apply_action(&mut version.questions, action)?;

        runtime
            .events
            .emit(EventPayload::TaskCompleted {
                task_id: format!("action-{}", index + 1),
                label,
            })
            .await
            .map_err(ToolError::from)?;
    }

    version.updated_at = Utc::now();
    runtime.repo.upsert_version(&version).await?;

    form.title = version.title.clone();
    form.description = version.description.clone();
    form.questions = version.questions.clone();
    form.settings = version.settings.clone();
    form.current_draft_version_id = Some(version.id);
    form.updated_at = version.updated_at;
    runtime.repo.update_form(&form).await?;

    emit_snapshot(runtime.events, &version, AgentStatus::Running, false)
        .await
        .map_err(ToolError::from)?;

    tracing::info!(
        form_id = %form_id,
        version_id = %version.id,
        questions = version.questions.len(),
        "Updated form draft"
    );

    Ok(serde_json::json!({
        "formId": form_id,
        "versionId": version.id,
        "questionCount": version.questions.len(),
    }))
}

/// Apply one action in place, returning a progress label.
fn apply_action(
    questions: &mut Vec<Question>,
    action: QuestionAction,
) -> Result<String, ToolError> {
    match action {
        QuestionAction::Add { question, position } => {
            let prepared = prepare(question)?;
            let label = format!("Added '{}'", prepared.title);
            let at = position.unwrap_or(questions.len()).min(questions.len());
            questions.insert(at, prepared);
            Ok(label)
        }

        QuestionAction::Update { question } => {
            let prepared = prepare(question)?;
            let index = questions
                .iter()
                .position(|q| q.id == prepared.id)
                .ok_or_else(|| {
                    ToolError::InvalidInput(format!("no question with id '{}'", prepared.id))
                })?;
            let label = format!("Updated '{}'", prepared.title);
            questions[index] = prepared;
            Ok(label)
        }

        QuestionAction::Remove { question_id } => {
            let index = questions
                .iter()
                .position(|q| q.id == question_id)
                .ok_or_else(|| {
                    ToolError::InvalidInput(format!("no question with id '{question_id}'"))
                })?;
            let removed = questions.remove(index);
            Ok(format!("Removed '{}'", removed.title))
        }
    }
}

/// Repair an incoming question and reject what repair cannot fix.
fn prepare(question: Question) -> Result<Question, ToolError> {
    let repaired = repair(&question).into_owned();
    validate(&repaired).map_err(|violation| ToolError::InvalidInput(violation.to_string()))?;
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formloom_types::question::{
        ChoiceOption, DisplayDescriptor, InputType, QuestionKind, SubmissionBehavior,
        ValidationRules,
    };

    fn question(id: &str, title: &str) -> Question {
        Question {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            display: DisplayDescriptor::for_input(InputType::Radio),
            validation: ValidationRules::default(),
            logic: None,
            submission_behavior: SubmissionBehavior::AutoAnswer,
            kind: QuestionKind::SingleChoice {
                options: vec![ChoiceOption::new("o1", "A"), ChoiceOption::new("o2", "B")],
            },
        }
    }

    #[test]
    fn add_appends_by_default() {
        let mut questions = vec![question("q1", "First")];
        let label = apply_action(
            &mut questions,
            QuestionAction::Add {
                question: question("q2", "Second"),
                position: None,
            },
        )
        .unwrap();
        assert_eq!(label, "Added 'Second'");
        assert_eq!(questions[1].id, "q2");
    }

    #[test]
    fn add_inserts_at_position_and_clamps() {
        let mut questions = vec![question("q1", "First"), question("q2", "Second")];
        apply_action(
            &mut questions,
            QuestionAction::Add {
                question: question("q0", "Zeroth"),
                position: Some(0),
            },
        )
        .unwrap();
        assert_eq!(questions[0].id, "q0");

        // An out-of-range position clamps to the end instead of panicking.
        apply_action(
            &mut questions,
            QuestionAction::Add {
                question: question("q9", "Last"),
                position: Some(99),
            },
        )
        .unwrap();
        assert_eq!(questions.last().unwrap().id, "q9");
    }

    #[test]
    fn add_repairs_incoming_question() {
        let mut broken = question("q1", "Pick one");
        broken.display.input_type = InputType::Checkbox; // disallowed for singleChoice
        broken.submission_behavior = SubmissionBehavior::ManualAnswer;

        let mut questions = vec![];
        apply_action(
            &mut questions,
            QuestionAction::Add {
                question: broken,
                position: None,
            },
        )
        .unwrap();

        assert_eq!(questions[0].display.input_type, InputType::Radio);
        assert_eq!(
            questions[0].submission_behavior,
            SubmissionBehavior::AutoAnswer
        );
    }

    #[test]
    fn update_unknown_id_is_invalid_input() {
        let mut questions = vec![question("q1", "First")];
        let err = apply_action(
            &mut questions,
            QuestionAction::Update {
                question: question("missing", "Ghost"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn remove_by_id() {
        let mut questions = vec![question("q1", "First"), question("q2", "Second")];
        let label = apply_action(
            &mut questions,
            QuestionAction::Remove {
                question_id: "q1".to_string(),
            },
        )
        .unwrap();
        assert_eq!(label, "Removed 'First'");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q2");
    }

    #[test]
    fn empty_options_rejected_not_repaired() {
        let mut broken = question("q1", "Pick one");
        broken.kind = QuestionKind::SingleChoice { options: vec![] };

        let mut questions = vec![];
        let err = apply_action(
            &mut questions,
            QuestionAction::Add {
                question: broken,
                position: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("no options"));
        assert!(questions.is_empty());
    }

    #[test]
    fn action_deserializes_from_tagged_json() {
        let value = serde_json::json!({
            "action": "remove",
            "questionId": "q3"
        });
        let action: QuestionAction = serde_json::from_value(value).unwrap();
        assert!(matches!(action, QuestionAction::Remove { question_id } if question_id == "q3"));
    }
}
