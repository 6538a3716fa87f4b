//! Form repository port.

use uuid::Uuid;

use formloom_types::error::RepositoryError;
use formloom_types::form::{Form, FormVersion, VersionStatus};

/// Storage interface for forms and their versions.
///
/// Writes are last-write-wins at the row level; there is no optimistic
/// concurrency token. Concurrent sessions editing the same form race, and
/// the later write prevails.
pub trait FormRepository: Send + Sync {
    /// Insert a new form row.
    fn create_form(&self, form: &Form)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a form by id.
    fn get_form(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<Form>, RepositoryError>> + Send;

    /// Replace a form row (content fields and version pointers).
    fn update_form(&self, form: &Form)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert or replace a version row.
    fn upsert_version(
        &self,
        version: &FormVersion,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a version by id.
    fn get_version(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<FormVersion>, RepositoryError>> + Send;

    /// Fetch a form's version with the given status, if one exists.
    fn get_version_by_status(
        &self,
        form_id: &Uuid,
        status: VersionStatus,
    ) -> impl Future<Output = Result<Option<FormVersion>, RepositoryError>> + Send;

    /// How many forms an owner currently has (usage limiting).
    fn count_forms_by_owner(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<u32, RepositoryError>> + Send;
}
