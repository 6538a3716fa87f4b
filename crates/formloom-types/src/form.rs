//! Form and form-version entities.
//!
//! A `Form` is the user-editable store: current content plus pointers to
//! its draft and published versions. A `FormVersion` is an immutable-ish
//! row owned by the version lifecycle; at most one draft and one published
//! version exist per form, and a published version is structurally frozen
//! (see the minor-update guard in formloom-core).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::question::Question;

/// Form-level settings map (theme, submit behavior, notifications...).
///
/// A BTreeMap keeps serialization deterministic, which the bridge
/// synchronizer relies on for change signatures.
pub type FormSettings = BTreeMap<String, serde_json::Value>;

/// Lifecycle status of a form version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Draft,
    Published,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStatus::Draft => write!(f, "draft"),
            VersionStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(VersionStatus::Draft),
            "published" => Ok(VersionStatus::Published),
            other => Err(format!("invalid version status: '{other}'")),
        }
    }
}

/// The user-editable form entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: Uuid,
    /// Owner user id (or guest id) from the auth layer.
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: FormSettings,
    /// Pointer to the open draft version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_draft_version_id: Option<Uuid>,
    /// Pointer to the published version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_published_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    /// Create an empty form shell for the given owner.
    pub fn new(id: Uuid, owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
            questions: Vec::new(),
            settings: FormSettings::new(),
            current_draft_version_id: None,
            current_published_version_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A form is published-only when it carries a published version and
    /// no open draft. The minor-update guard applies in that state.
    pub fn is_published_only(&self) -> bool {
        self.current_published_version_id.is_some() && self.current_draft_version_id.is_none()
    }
}

/// A snapshot of form content owned by one version row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormVersion {
    pub id: Uuid,
    pub form_id: Uuid,
    pub status: VersionStatus,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: FormSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The agent-owned projection of form content carried by state snapshots.
///
/// This is what the client reducer holds as `currentForm` and what the
/// bridge synchronizer merges into the user-editable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub form_id: Uuid,
    pub version_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: FormSettings,
}

impl FormSnapshot {
    /// Project a version row into the snapshot shape.
    pub fn from_version(version: &FormVersion) -> Self {
        Self {
            form_id: version.form_id,
            version_id: version.id,
            title: version.title.clone(),
            description: version.description.clone(),
            questions: version.questions.clone(),
            settings: version.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_status_display_and_parse() {
        assert_eq!(VersionStatus::Draft.to_string(), "draft");
        assert_eq!(VersionStatus::Published.to_string(), "published");
        assert_eq!("published".parse::<VersionStatus>().unwrap(), VersionStatus::Published);
        assert!("frozen".parse::<VersionStatus>().is_err());
    }

    #[test]
    fn new_form_has_no_versions() {
        let form = Form::new(Uuid::now_v7(), "user-1", "Feedback");
        assert!(form.current_draft_version_id.is_none());
        assert!(form.current_published_version_id.is_none());
        assert!(!form.is_published_only());
    }

    #[test]
    fn published_only_requires_no_open_draft() {
        let mut form = Form::new(Uuid::now_v7(), "user-1", "Feedback");
        form.current_published_version_id = Some(Uuid::now_v7());
        assert!(form.is_published_only());

        form.current_draft_version_id = Some(Uuid::now_v7());
        assert!(!form.is_published_only());
    }

    #[test]
    fn snapshot_projects_version_fields() {
        let now = Utc::now();
        let version = FormVersion {
            id: Uuid::now_v7(),
            form_id: Uuid::now_v7(),
            status: VersionStatus::Draft,
            title: "Survey".to_string(),
            description: Some("About us".to_string()),
            questions: vec![],
            settings: FormSettings::new(),
            created_at: now,
            updated_at: now,
        };

        let snapshot = FormSnapshot::from_version(&version);
        assert_eq!(snapshot.version_id, version.id);
        assert_eq!(snapshot.form_id, version.form_id);
        assert_eq!(snapshot.title, "Survey");
        assert_eq!(snapshot.description.as_deref(), Some("About us"));
    }

    #[test]
    fn form_serde_uses_camel_case() {
        let form = Form::new(Uuid::now_v7(), "user-1", "Feedback");
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("ownerId").is_some());
        assert!(json.get("createdAt").is_some());
        // Empty pointers are omitted entirely
        assert!(json.get("currentDraftVersionId").is_none());
    }
}
