//! Bridge synchronizer.
//!
//! Reconciles agent-produced form snapshots with the user-editable form
//! store. Each snapshot is reduced to a change signature; identical
//! signatures are skipped so redundant snapshots neither hit the store nor
//! clobber concurrent user edits to fields the agent does not own.

use sha2::{Digest, Sha256};

use formloom_types::error::{FormError, RepositoryError};
use formloom_types::form::FormSnapshot;

use crate::repository::FormRepository;

/// Compute the change signature for a snapshot.
///
/// Covers exactly the fields the bridge owns: version id, serialized
/// questions, title, description, serialized settings. Serialization of
/// the settings map is deterministic (BTreeMap ordering), so equal content
/// always hashes equally.
pub fn change_signature(snapshot: &FormSnapshot) -> String {
    let questions =
        serde_json::to_string(&snapshot.questions).expect("questions serialize");
    let settings = serde_json::to_string(&snapshot.settings).expect("settings serialize");

    let mut hasher = Sha256::new();
    hasher.update(snapshot.version_id.as_bytes());
    hasher.update(snapshot.title.as_bytes());
    hasher.update(snapshot.description.as_deref().unwrap_or_default().as_bytes());
    hasher.update(questions.as_bytes());
    hasher.update(settings.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Applies agent snapshots to the form store with change detection.
///
/// One synchronizer per live session; the signature of the last applied
/// snapshot is kept so replays and no-op snapshots are skipped cheaply.
#[derive(Debug, Default)]
pub struct BridgeSynchronizer {
    last_signature: Option<String>,
}

impl BridgeSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a snapshot to the store if its signature is new.
    ///
    /// Returns `Ok(true)` when the store was written, `Ok(false)` when the
    /// snapshot was a duplicate. On apply, the agent's version id becomes
    /// the form's draft pointer; the published pointer is never touched.
    pub async fn sync<R: FormRepository>(
        &mut self,
        repo: &R,
        snapshot: &FormSnapshot,
    ) -> Result<bool, FormError> {
        let signature = change_signature(snapshot);
        if self.last_signature.as_deref() == Some(signature.as_str()) {
            tracing::debug!(form_id = %snapshot.form_id, "Snapshot unchanged, skipping sync");
            return Ok(false);
        }

        let mut form = repo
            .get_form(&snapshot.form_id)
            .await
            .map_err(storage_error)?
            .ok_or(FormError::NotFound)?;

        form.title = snapshot.title.clone();
        form.description = snapshot.description.clone();
        form.questions = snapshot.questions.clone();
        form.settings = snapshot.settings.clone();
        form.current_draft_version_id = Some(snapshot.version_id);
        form.updated_at = chrono::Utc::now();

        repo.update_form(&form).await.map_err(storage_error)?;

        tracing::debug!(
            form_id = %snapshot.form_id,
            version_id = %snapshot.version_id,
            "Applied agent snapshot to form store"
        );
        self.last_signature = Some(signature);
        Ok(true)
    }
}

fn storage_error(err: RepositoryError) -> FormError {
    FormError::Storage(err.to_string())
}
