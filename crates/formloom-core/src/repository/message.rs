//! Chat message repository port.

use uuid::Uuid;

use formloom_types::chat::ChatMessage;
use formloom_types::error::RepositoryError;

/// Storage interface for a form's conversation thread.
pub trait MessageRepository: Send + Sync {
    /// Persist one message.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages for a form, oldest first.
    fn list_for_form(
        &self,
        form_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
