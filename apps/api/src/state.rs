use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::tokens::TokenService;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::storage::ImageStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable image store. Production: S3; tests substitute a recorder.
    pub images: Arc<dyn ImageStore>,
    pub llm: LlmClient,
    pub tokens: TokenService,
    pub config: Config,
}
