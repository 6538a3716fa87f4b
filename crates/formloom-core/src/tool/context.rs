//! Read-only and UI-affordance tools: queryDocs, showConfigButton,
//! getFormContext.

use schemars::JsonSchema;
use serde::Deserialize;

use formloom_types::error::{FormError, ToolError};
use formloom_types::event::EventPayload;
use formloom_types::form::VersionStatus;

use crate::llm::LanguageModel;
use crate::repository::FormRepository;

use super::ToolRuntime;

/// Input contract for the queryDocs tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryDocsInput {
    /// Search terms, e.g. "conditional logic" or "publish".
    pub query: String,
}

/// Input contract for the showConfigButton tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowConfigButtonInput {
    /// The settings section the button should open.
    pub section: String,
}

/// Input contract for the getFormContext tool (no parameters).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFormContextInput {}

/// Embedded documentation topics served to the model.
const DOC_TOPICS: &[(&str, &str)] = &[
    (
        "question types",
        "Supported question types: singleChoice, multipleChoice, text, date, \
         rating, linearScale, likertScale, address, ranking, fileUpload. Choice \
         questions render compact controls below 4 options and dropdown-style \
         controls at 4 or more.",
    ),
    (
        "publishing",
        "Publishing freezes a form's structure: question count, order, and \
         types become immutable. Only content edits (titles, descriptions, \
         option labels, validation) are allowed afterwards, via minor updates.",
    ),
    (
        "conditional logic",
        "A question can be shown or hidden based on another question's answer \
         using an operator (equals, notEquals, contains, greaterThan, lessThan) \
         and a comparison value.",
    ),
    (
        "submission behavior",
        "Single-interaction controls (radio, dropdown, date, star, linear \
         scale, file upload) auto-advance. Multi-select and multi-field \
         controls wait for explicit confirmation. Free-text questions cannot \
         infer completeness.",
    ),
    (
        "drafts",
        "Editing always happens on a draft version. The draft becomes visible \
         to respondents only when published. A form has at most one draft and \
         one published version.",
    ),
];

/// Keyword lookup over the embedded topics.
pub async fn query_docs(input: QueryDocsInput) -> Result<serde_json::Value, ToolError> {
    let needle = input.query.to_lowercase();
    let terms: Vec<&str> = needle.split_whitespace().collect();

    let matches: Vec<serde_json::Value> = DOC_TOPICS
        .iter()
        .filter(|(topic, body)| {
            terms.iter().any(|term| {
                topic.contains(term) || body.to_lowercase().contains(term)
            })
        })
        .map(|(topic, body)| serde_json::json!({"topic": topic, "content": body}))
        .collect();

    if matches.is_empty() {
        return Ok(serde_json::json!({
            "results": [],
            "note": "no matching documentation; try different terms",
        }));
    }

    Ok(serde_json::json!({ "results": matches }))
}

/// Emit the UI event that surfaces a configuration affordance.
pub async fn show_config_button<R, M>(
    input: ShowConfigButtonInput,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<serde_json::Value, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    runtime
        .events
        .emit(EventPayload::ShowConfigButton {
            section: input.section.clone(),
        })
        .await
        .map_err(ToolError::from)?;

    Ok(serde_json::json!({ "acknowledged": true, "section": input.section }))
}

/// Fetch the current form and its working version for the model.
pub async fn get_form_context<R, M>(
    _input: GetFormContextInput,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<serde_json::Value, ToolError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let form_id = runtime.events.form_id();

    let Some(form) = runtime.repo.get_form(&form_id).await? else {
        return Ok(serde_json::json!({ "form": null }));
    };

    // Prefer the draft (what the agent edits); fall back to published.
    let version = match runtime
        .repo
        .get_version_by_status(&form_id, VersionStatus::Draft)
        .await?
    {
        Some(version) => Some(version),
        None => {
            runtime
                .repo
                .get_version_by_status(&form_id, VersionStatus::Published)
                .await?
        }
    };

    let version = version.ok_or(FormError::VersionNotFound)?;

    Ok(serde_json::json!({
        "form": {
            "id": form.id,
            "title": version.title,
            "description": version.description,
            "status": version.status.to_string(),
            "versionId": version.id,
            "questions": version.questions,
            "settings": version.settings,
            "isPublishedOnly": form.is_published_only(),
        }
    }))
}
