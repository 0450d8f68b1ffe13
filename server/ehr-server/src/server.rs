use auth_identity::{
    IdentifierAllocator, IdentityService, InMemoryPrincipalRepository, PgPrincipalRepository,
    PrincipalRepository, TokenService,
};
use clinical_records::{InMemoryRecordRepository, PgRecordRepository, RecordRepository, RecordService};
use error_common::EhrError;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;

/// Which backend the stores run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Postgres,
    InMemory,
}

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct EhrServer {
    pub config: Arc<ServerConfig>,
    pub identity: Arc<IdentityService>,
    pub tokens: Arc<TokenService>,
    pub records: Arc<RecordService>,
    pub storage: StorageKind,
    pub started_at: Instant,
}

impl EhrServer {
    /// Connect to PostgreSQL when a database URL is configured, otherwise
    /// run on in-memory stores
    pub async fn new(config: ServerConfig) -> Result<Self, EhrError> {
        let Some(database_url) = config.database_url.clone() else {
            tracing::warn!("No database_url configured; records live in memory only");
            return Ok(Self::in_memory(config));
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&database_url)
            .await
            .map_err(|e| EhrError::DatabaseError(format!("failed to connect: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| EhrError::DatabaseError(format!("migration failed: {e}")))?;

        tracing::info!("Database migrations applied");
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: ServerConfig, pool: PgPool) -> Self {
        let principals: Arc<dyn PrincipalRepository> = Arc::new(PgPrincipalRepository::new(pool.clone()));
        let records: Arc<dyn RecordRepository> = Arc::new(PgRecordRepository::new(pool));
        Self::from_parts(config, principals, records, StorageKind::Postgres)
    }

    pub fn in_memory(config: ServerConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(InMemoryPrincipalRepository::new()),
            Arc::new(InMemoryRecordRepository::new()),
            StorageKind::InMemory,
        )
    }

    pub fn from_parts(
        config: ServerConfig,
        principals: Arc<dyn PrincipalRepository>,
        records: Arc<dyn RecordRepository>,
        storage: StorageKind,
    ) -> Self {
        let tokens = TokenService::from_config(&config.identity);
        let identity = IdentityService::new(principals.clone(), config.identity.clone());
        let allocator = IdentifierAllocator::system().with_max_attempts(config.identity.max_id_attempts);
        let records = RecordService::new(records, principals).with_allocator(allocator);

        Self {
            config: Arc::new(config),
            identity: Arc::new(identity),
            tokens: Arc::new(tokens),
            records: Arc::new(records),
            storage,
            started_at: Instant::now(),
        }
    }
}
