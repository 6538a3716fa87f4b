//! The createForm tool executor.
//!
//! A three-phase incremental pipeline: plan (one model call producing the
//! form outline and the authoritative task count), per-question generation
//! (one structured model call per planned question, with a bounded
//! repair-and-retry loop), and finalize (persist the form row and its
//! draft version). Progress is streamed as events after every phase
//! transition so clients can render the form growing question by question.

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

use formloom_types::agent::AgentStatus;
use formloom_types::chat::MessageRole;
use formloom_types::error::ToolError;
use formloom_types::event::EventPayload;
use formloom_types::form::{Form, FormSettings, FormVersion, VersionStatus};
use formloom_types::llm::{CompletionRequest, Message};
use formloom_types::question::Question;

use crate::llm::LanguageModel;
use crate::repository::FormRepository;
use crate::schema::repair::{repair, validate};

use super::{ToolRuntime, complete_bounded, emit_snapshot, parse_json_payload};

/// Input contract for the createForm tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormInput {
    /// Natural-language description of the form to build.
    pub prompt: String,
}

/// The planning phase's output shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormPlan {
    title: String,
    #[serde(default)]
    description: Option<String>,
    questions: Vec<QuestionBrief>,
}

/// One planned question, expanded by a dedicated generation call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionBrief {
    title: String,
    question_type: String,
    #[serde(default)]
    hint: Option<String>,
}

const PLAN_SYSTEM_PROMPT: &str = "\
You plan online forms. Given a description, respond with ONLY a JSON object:
{\"title\": string, \"description\": string|null, \"questions\": [{\"title\": string, \
\"questionType\": one of singleChoice|multipleChoice|text|date|rating|linearScale|\
likertScale|address|ranking|fileUpload, \"hint\": string|null}]}
Plan between 3 and 10 questions. No prose, no code fences.";

const QUESTION_SYSTEM_PROMPT: &str = "\
You generate one form question as JSON. Respond with ONLY a JSON object with the
fields: id (kebab-case slug), title, description (optional), questionType,
display {inputType, showTitle, showDescription}, validation {required},
submissionBehavior, plus the type-specific fields (options [{id,label}] for
choice/ranking, min/max for linearScale, statements/scaleLabels for
likertScale, max for rating). No prose, no code fences.";

/// Run the full create pipeline. Returns the tool output for the model.
pub async fn run<R, M>(
    input: CreateFormInput,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<serde_json::Value, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let form_id = runtime.events.form_id();

    if runtime.repo.get_form(&form_id).await?.is_some() {
        return Err(ToolError::InvalidInput(
            "a form already exists for this conversation; use the updateForm tool".to_string(),
        ));
    }

    // Phase 1: plan.
    let plan = plan_form(&input.prompt, runtime).await?;
    let total = plan.questions.len() as u32;

    runtime
        .events
        .emit(EventPayload::AgentWarning {
            message: format!("Planned {total} questions for '{}'", plan.title),
            planned_tasks: Some(total),
        })
        .await
        .map_err(ToolError::from)?;

    // Create the form shell and an empty draft so every later snapshot has
    // a version id to point at.
    let now = Utc::now();
    let mut form = Form::new(form_id, runtime.user.user_id.clone(), plan.title.clone());
    form.description = plan.description.clone();
    runtime.repo.create_form(&form).await?;

    let mut version = FormVersion {
        id: Uuid::now_v7(),
        form_id,
        status: VersionStatus::Draft,
        title: plan.title.clone(),
        description: plan.description.clone(),
        questions: Vec::new(),
        settings: FormSettings::new(),
        created_at: now,
        updated_at: now,
    };
    runtime.repo.upsert_version(&version).await?;
    emit_snapshot(runtime.events, &version, AgentStatus::Running, false)
        .await
        .map_err(ToolError::from)?;

    // Phase 2: generate each planned question, snapshotting as we go.
    for (index, brief) in plan.questions.iter().enumerate() {
        let task_id = format!("question-{}", index + 1);

        runtime
            .events
            .emit(EventPayload::TaskStarted {
                task_id: task_id.clone(),
                label: brief.title.clone(),
            })
            .await
            .map_err(ToolError::from)?;

        let question = generate_question(&plan.title, brief, runtime).await?;
        version.questions.push(question);
        version.updated_at = Utc::now();
        runtime.repo.upsert_version(&version).await?;

        runtime
            .events
            .emit(EventPayload::TaskCompleted {
                task_id,
                label: brief.title.clone(),
            })
            .await
            .map_err(ToolError::from)?;
        emit_snapshot(runtime.events, &version, AgentStatus::Running, false)
            .await
            .map_err(ToolError::from)?;
    }

    // Phase 3: finalize the user-editable form row.
    form.questions = version.questions.clone();
    form.settings = version.settings.clone();
    form.current_draft_version_id = Some(version.id);
    form.updated_at = Utc::now();
    runtime.repo.update_form(&form).await?;

    tracing::info!(
        form_id = %form_id,
        version_id = %version.id,
        questions = version.questions.len(),
        "Created form draft"
    );

    Ok(serde_json::json!({
        "formId": form_id,
        "versionId": version.id,
        "questionCount": version.questions.len(),
    }))
}

/// One planning call under the ancillary time bound.
async fn plan_form<R, M>(
    prompt: &str,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<FormPlan, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let request = CompletionRequest {
        model: runtime.config.default_model.clone(),
        messages: vec![Message {
            role: MessageRole::User,
            content: prompt.to_string(),
        }],
        system: Some(PLAN_SYSTEM_PROMPT.to_string()),
        max_tokens: 2048,
        temperature: Some(0.7),
        tools: vec![],
        stop_sequences: None,
    };

    let response = complete_bounded(runtime.model, &request, runtime.config).await?;
    let value = parse_json_payload(&response.content)?;
    let plan: FormPlan = serde_json::from_value(value)
        .map_err(|e| ToolError::Generation(format!("plan did not match contract: {e}")))?;

    if plan.questions.is_empty() {
        return Err(ToolError::Generation(
            "plan contained no questions".to_string(),
        ));
    }

    Ok(plan)
}

/// Generate one question with the bounded repair-and-retry loop.
///
/// Each attempt feeds the previous violation and the offending payload
/// back into a follow-up generation call. Exhausting the budget is a
/// terminal generation error for the tool.
async fn generate_question<R, M>(
    form_title: &str,
    brief: &QuestionBrief,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<Question, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let attempts = runtime.config.repair_attempts.max(1);
    let mut feedback: Option<(String, String)> = None;

    for attempt in 0..attempts {
        let mut prompt = format!(
            "Form: {form_title}\nQuestion title: {}\nQuestion type: {}",
            brief.title, brief.question_type
        );
        if let Some(hint) = &brief.hint {
            prompt.push_str(&format!("\nHint: {hint}"));
        }
        if let Some((violation, payload)) = &feedback {
            prompt.push_str(&format!(
                "\n\nYour previous attempt was rejected: {violation}\nPrevious payload:\n{payload}\nFix the problem and respond with the corrected JSON object."
            ));
        }

        let request = CompletionRequest {
            model: runtime.config.default_model.clone(),
            messages: vec![Message {
                role: MessageRole::User,
                content: prompt,
            }],
            system: Some(QUESTION_SYSTEM_PROMPT.to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
            tools: vec![],
            stop_sequences: None,
        };

        let response = complete_bounded(runtime.model, &request, runtime.config).await?;

        match parse_and_validate(&response.content) {
            Ok(question) => return Ok(question),
            Err((violation, payload)) => {
                tracing::debug!(
                    attempt,
                    question = %brief.title,
                    violation = %violation,
                    "Generated question failed validation, retrying"
                );
                feedback = Some((violation, payload));
            }
        }
    }

    let (violation, _) = feedback.expect("at least one attempt ran");
    Err(ToolError::Generation(format!(
        "question '{}' failed validation after {attempts} attempts: {violation}",
        brief.title
    )))
}

/// Parse model output into a question, repair it, and validate the result.
///
/// Returns the violation message and the offending payload on failure so
/// the retry prompt can include both.
fn parse_and_validate(content: &str) -> Result<Question, (String, String)> {
    let value = match parse_json_payload(content) {
        Ok(value) => value,
        Err(err) => return Err((err.to_string(), content.trim().to_string())),
    };

    let payload = value.to_string();
    let question: Question = match serde_json::from_value(value) {
        Ok(question) => question,
        Err(err) => {
            return Err((format!("question did not match contract: {err}"), payload));
        }
    };

    let repaired = repair(&question).into_owned();
    match validate(&repaired) {
        Ok(()) => Ok(repaired),
        Err(violation) => Err((violation.to_string(), payload)),
    }
}
