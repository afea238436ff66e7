pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    credential_pool::CredentialPool, gemini_client::GeminiClient,
    generation_service::GenerationService, type_catalog::TypeCatalog,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub generation_service: GenerationService,
    pub type_catalog: Arc<TypeCatalog>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let credentials = Arc::new(CredentialPool::new(config.gemini_api_keys.clone())?);
        tracing::info!("Loaded {} Gemini credential(s)", credentials.len());

        let gemini_client = GeminiClient::new(
            http_client,
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        );
        let generation_service = GenerationService::new(
            gemini_client,
            credentials,
            config.generation.clone(),
            config.gemini_max_output_tokens,
        );

        Ok(Self {
            generation_service,
            type_catalog: Arc::new(TypeCatalog::with_defaults()),
        })
    }
}
