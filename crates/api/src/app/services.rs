//! Service wiring: job store, language model, engine, orchestrator.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use archigenie_ai::{GenerationEngine, LanguageModel, LlmError};
use archigenie_infra::Settings;
use archigenie_infra::jobs::{
    JobOrchestrator, JobQuery, JobStore, JobStoreError, OrchestratorConfig, select_job_store,
};
use archigenie_infra::llm::build_language_model;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("job store: {0}")]
    Store(#[from] JobStoreError),

    #[error("language model: {0}")]
    Model(#[from] LlmError),
}

/// Shared handles for request handlers.
pub struct AppServices {
    pub orchestrator: JobOrchestrator,
    pub query: JobQuery,
    pub settings: Settings,
}

impl AppServices {
    /// Wire services around an already-selected store and model.
    pub fn new(
        settings: Settings,
        store: Arc<dyn JobStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let engine = Arc::new(GenerationEngine::new(model, settings.engine_config()));
        let config = OrchestratorConfig::default().with_job_ttl(settings.job_ttl());
        let orchestrator = JobOrchestrator::new(store.clone(), engine, config);

        Self {
            orchestrator,
            query: JobQuery::new(store),
            settings,
        }
    }

    pub fn job_store_backend(&self) -> &'static str {
        self.query.backend()
    }
}

/// Build production services from settings: ping the store, construct the
/// configured provider client.
pub async fn build_services(settings: Settings) -> Result<AppServices, ServiceError> {
    let store = select_job_store(&settings).await?;
    let model = build_language_model(&settings)?;

    info!(
        app_env = %settings.app_env,
        provider = model.provider(),
        model = model.model(),
        prompt_variant = %settings.prompt_variant,
        job_store = store.backend(),
        "services ready"
    );

    Ok(AppServices::new(settings, store, model))
}
