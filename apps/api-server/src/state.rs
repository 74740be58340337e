//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::UnitOfWork;
use quill_core::ports::{
    ChangeWriter, PasswordService, PostRepository, TagRepository, TokenService, UserRepository,
};
use quill_infra::database::InMemoryDatabase;
use quill_infra::{Argon2PasswordService, JwtTokenService};

#[cfg(feature = "postgres")]
use quill_infra::database::{
    DatabaseConnections, PostgresChangeWriter, PostgresPostRepository, PostgresTagRepository,
    PostgresUserRepository,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub tags: Arc<dyn TagRepository>,
    /// Transactional sink for unit-of-work flushes.
    pub writer: Arc<dyn ChangeWriter>,
    pub passwords: Arc<dyn PasswordService>,
    pub tokens: Arc<dyn TokenService>,
    #[cfg(feature = "postgres")]
    pub db: Option<DatabaseConnections>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));

        #[cfg(feature = "postgres")]
        {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => {
                        tracing::info!("Application state initialized (postgres)");
                        return Self {
                            users: Arc::new(PostgresUserRepository::new(connections.main.clone())),
                            posts: Arc::new(PostgresPostRepository::new(connections.main.clone())),
                            tags: Arc::new(PostgresTagRepository::new(connections.main.clone())),
                            writer: Arc::new(PostgresChangeWriter::new(connections.main.clone())),
                            passwords,
                            tokens,
                            db: Some(connections),
                        };
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            }
        }

        #[cfg(not(feature = "postgres"))]
        tracing::info!("Running without postgres feature - using in-memory repositories");

        tracing::info!("Application state initialized (in-memory)");
        Self::in_memory(passwords, tokens)
    }

    /// State backed by fresh in-memory repositories.
    pub fn in_memory(passwords: Arc<dyn PasswordService>, tokens: Arc<dyn TokenService>) -> Self {
        let db = InMemoryDatabase::new();
        Self {
            users: Arc::new(db.users()),
            posts: Arc::new(db.posts()),
            tags: Arc::new(db.tags()),
            writer: Arc::new(db),
            passwords,
            tokens,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self.writer.as_ref())
    }

    /// Name of the storage backend in use.
    pub fn storage(&self) -> &'static str {
        #[cfg(feature = "postgres")]
        {
            if self.db.is_some() {
                return "postgres";
            }
        }
        "memory"
    }
}
