//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the CLI and the
//! REST API. Core services are generic over repository/model traits; the
//! state pins them to the SQLite and Anthropic implementations.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use secrecy::SecretString;
use uuid::Uuid;

use formloom_core::service::FormService;
use formloom_infra::config::{load_global_config, resolve_data_dir};
use formloom_infra::llm::anthropic::AnthropicModel;
use formloom_infra::sqlite::form::SqliteFormRepository;
use formloom_infra::sqlite::message::SqliteMessageRepository;
use formloom_infra::sqlite::pool::DatabasePool;
use formloom_infra::sqlite::usage::SqliteUsageLimiter;
use formloom_types::config::GlobalConfig;

/// Concrete type alias for the form service pinned to SQLite.
pub type ConcreteFormService = FormService<SqliteFormRepository>;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub form_service: Arc<ConcreteFormService>,
    pub form_repo: Arc<SqliteFormRepository>,
    pub message_repo: Arc<SqliteMessageRepository>,
    pub limiter: Arc<SqliteUsageLimiter>,
    pub model: Arc<AnthropicModel>,
    pub config: Arc<GlobalConfig>,
    /// Forms with a turn currently streaming. One orchestrator instance
    /// per session turn: a second concurrent turn for the same form is
    /// rejected at the HTTP layer.
    pub active_turns: Arc<DashMap<Uuid, ()>>,
    pub db_pool: DatabasePool,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to the database, load
    /// config, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("formloom.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let config = load_global_config(&data_dir).await;

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY is not set"))?;
        let model = AnthropicModel::new(SecretString::from(api_key));

        Self::from_parts(db_pool, config, model, data_dir)
    }

    /// Wire services from already-constructed parts (used by tests).
    pub fn from_parts(
        db_pool: DatabasePool,
        config: GlobalConfig,
        model: AnthropicModel,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let limiter = SqliteUsageLimiter::new(db_pool.clone(), &config);
        let form_service = FormService::new(SqliteFormRepository::new(db_pool.clone()));
        let form_repo = SqliteFormRepository::new(db_pool.clone());
        let message_repo = SqliteMessageRepository::new(db_pool.clone());

        Ok(Self {
            form_service: Arc::new(form_service),
            form_repo: Arc::new(form_repo),
            message_repo: Arc::new(message_repo),
            limiter: Arc::new(limiter),
            model: Arc::new(model),
            config: Arc::new(config),
            active_turns: Arc::new(DashMap::new()),
            db_pool,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[tokio::test]
    async fn from_parts_wires_state() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let state = AppState::from_parts(
            pool,
            GlobalConfig::default(),
            AnthropicModel::new(SecretString::from("test-key")),
            dir.path().to_path_buf(),
        )
        .unwrap();

        assert_eq!(state.config.max_steps, 5);
        assert!(state.active_turns.is_empty());
    }
}
