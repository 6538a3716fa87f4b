//! Form service: version-aware reads, guarded minor updates, and the
//! non-streamed AI creation path.
//!
//! Generic over the repository port; the API layer pins it to the SQLite
//! implementation.

use uuid::Uuid;

use formloom_types::config::GlobalConfig;
use formloom_types::error::{FormError, RepositoryError, ToolError};
use formloom_types::form::{Form, FormSettings, FormVersion, VersionStatus};
use formloom_types::identity::AuthUser;
use formloom_types::question::Question;

use crate::event::session_channel;
use crate::llm::LanguageModel;
use crate::repository::FormRepository;
use crate::schema::guard::validate_minor_update;
use crate::schema::repair::{repair, validate};
use crate::tool::create_form::{self, CreateFormInput};
use crate::tool::ToolRuntime;

/// Content-only update payload for PATCH. Absent fields stay untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorUpdatePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub settings: Option<FormSettings>,
}

/// Service for form reads and writes outside the agent loop.
pub struct FormService<R> {
    repo: R,
}

impl<R: FormRepository> FormService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Fetch the form row.
    pub async fn get_form(&self, id: &Uuid) -> Result<Form, FormError> {
        self.repo
            .get_form(id)
            .await
            .map_err(storage)?
            .ok_or(FormError::NotFound)
    }

    /// The public view of a form: published version if present, else draft.
    pub async fn get_current_view(&self, id: &Uuid) -> Result<FormVersion, FormError> {
        self.get_form(id).await?;

        for status in [VersionStatus::Published, VersionStatus::Draft] {
            if let Some(version) = self
                .repo
                .get_version_by_status(id, status)
                .await
                .map_err(storage)?
            {
                return Ok(version);
            }
        }
        Err(FormError::VersionNotFound)
    }

    /// Apply a content update.
    ///
    /// With an open draft the update lands on the draft unguarded. On a
    /// published-only form the minor-update guard validates the question
    /// list structurally first, then the published version is mutated in
    /// place -- no new version is created.
    pub async fn minor_update(
        &self,
        id: &Uuid,
        payload: MinorUpdatePayload,
    ) -> Result<FormVersion, FormError> {
        let mut form = self.get_form(id).await?;

        let draft = self
            .repo
            .get_version_by_status(id, VersionStatus::Draft)
            .await
            .map_err(storage)?;

        let mut version = match draft {
            Some(draft) => draft,
            None => {
                let published = self
                    .repo
                    .get_version_by_status(id, VersionStatus::Published)
                    .await
                    .map_err(storage)?
                    .ok_or(FormError::VersionNotFound)?;

                // Published-only: the schema is frozen.
                if let Some(questions) = &payload.questions {
                    validate_minor_update(&published.questions, questions)?;
                }
                published
            }
        };

        if let Some(title) = payload.title {
            version.title = title;
        }
        if let Some(description) = payload.description {
            version.description = Some(description);
        }
        if let Some(questions) = payload.questions {
            version.questions = prepare_questions(questions)?;
        }
        if let Some(settings) = payload.settings {
            version.settings = settings;
        }
        version.updated_at = chrono::Utc::now();

        self.repo.upsert_version(&version).await.map_err(storage)?;

        form.title = version.title.clone();
        form.description = version.description.clone();
        form.questions = version.questions.clone();
        form.settings = version.settings.clone();
        form.updated_at = version.updated_at;
        self.repo.update_form(&form).await.map_err(storage)?;

        tracing::info!(form_id = %id, version_id = %version.id, status = %version.status, "Applied minor update");
        Ok(version)
    }

    /// AI-driven creation without a client stream (POST /forms/{id}).
    ///
    /// Runs the createForm executor against a throwaway event channel;
    /// progress events are drained and dropped. Returns the new form and
    /// draft version ids.
    pub async fn ai_create<M: LanguageModel>(
        &self,
        model: &M,
        config: &GlobalConfig,
        user: &AuthUser,
        form_id: Uuid,
        prompt: &str,
    ) -> Result<(Uuid, Uuid), FormError> {
        let (emitter, mut rx) =
            session_channel(config.event_channel_capacity, form_id, user.user_id.clone());

        // Nobody is listening; keep the channel drained so the executor
        // never blocks on capacity.
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let runtime = ToolRuntime {
            repo: &self.repo,
            model,
            events: &emitter,
            user,
            config,
        };

        let result = create_form::run(
            CreateFormInput {
                prompt: prompt.to_string(),
            },
            &runtime,
        )
        .await;

        drop(emitter);
        let _ = drain.await;

        let output = result.map_err(tool_error)?;
        let version_id = output["versionId"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| FormError::Generation("missing version id in result".to_string()))?;

        Ok((form_id, version_id))
    }
}

/// Repair and validate user-supplied questions before persisting.
fn prepare_questions(questions: Vec<Question>) -> Result<Vec<Question>, FormError> {
    questions
        .into_iter()
        .map(|question| {
            let repaired = repair(&question).into_owned();
            validate(&repaired)
                .map_err(|violation| FormError::InvalidQuestion(violation.to_string()))?;
            Ok(repaired)
        })
        .collect()
}

fn storage(err: RepositoryError) -> FormError {
    FormError::Storage(err.to_string())
}

fn tool_error(err: ToolError) -> FormError {
    match err {
        ToolError::Form(form_error) => form_error,
        other => FormError::Generation(other.to_string()),
    }
}
