//! # contacts-db
//!
//! Storage layer for the contacts service.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgContactRepository`], the PostgreSQL contact repository
//! - [`InMemoryContactRepository`] for tests and throwaway servers
//! - [`Storage::open`], which picks a backend from a connection string
//!
//! ## Example
//!
//! ```rust,ignore
//! use contacts_db::{Storage, NewContact};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Storage::open("postgres://localhost/contacts").await?;
//!     let contacts = storage.repository();
//!
//!     let id = contacts.create("u1", NewContact::new("Jane Doe")).await?;
//!     println!("Created contact: {}", id);
//!
//!     storage.close().await;
//!     Ok(())
//! }
//! ```
pub mod contacts;
pub mod memory;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

use tracing::info;

// Re-export core types
pub use contacts_core::*;

pub use contacts::PgContactRepository;
pub use memory::InMemoryContactRepository;
pub use pool::{create_pool_with_config, log_pool_metrics, PoolConfig};

/// Connection-string scheme selecting the in-memory backend.
pub const MEMORY_SCHEME: &str = "memory:";

/// PostgreSQL database context with its repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Contact repository for CRUD and search.
    pub contacts: PgContactRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            contacts: PgContactRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Close every pooled connection. The context is unusable afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// An opened storage backend.
pub enum Storage {
    Postgres(Database),
    Memory(Arc<InMemoryContactRepository>),
}

impl Storage {
    /// Open the backend named by `url`.
    ///
    /// - `memory:` (optionally followed by anything) gives a fresh in-memory store
    /// - `postgres://` / `postgresql://` connects and runs pending migrations
    pub async fn open(url: &str) -> Result<Self> {
        Self::open_with_config(url, PoolConfig::default()).await
    }

    /// Like [`Storage::open`] with explicit pool settings for PostgreSQL.
    pub async fn open_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        if url.starts_with(MEMORY_SCHEME) {
            info!(
                subsystem = "database",
                component = "storage",
                backend = "memory",
                "Using in-memory contact store"
            );
            return Ok(Storage::Memory(Arc::new(InMemoryContactRepository::new())));
        }

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let db = Database::connect_with_config(url, config).await?;
            #[cfg(feature = "migrations")]
            db.migrate().await?;
            log_pool_metrics(db.pool());
            info!(
                subsystem = "database",
                component = "storage",
                backend = "postgres",
                "Using PostgreSQL contact store"
            );
            return Ok(Storage::Postgres(db));
        }

        Err(Error::Config(format!(
            "unsupported storage URL scheme in {:?}; expected postgres:// or {}",
            redact_url(url),
            MEMORY_SCHEME
        )))
    }

    /// Backend name for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            Storage::Postgres(_) => "postgres",
            Storage::Memory(_) => "memory",
        }
    }

    /// Shared repository handle for request handlers.
    pub fn repository(&self) -> Arc<dyn ContactRepository> {
        match self {
            Storage::Postgres(db) => Arc::new(db.contacts.clone()),
            Storage::Memory(repo) => repo.clone(),
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Storage::Postgres(db) = self {
            db.close().await;
        }
    }
}

/// Strip credentials from a connection string before it is logged or echoed.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_credentials() {
        assert_eq!(
            redact_url("postgres://user:secret@db:5432/contacts"),
            "postgres://***@db:5432/contacts"
        );
        assert_eq!(redact_url("memory:"), "memory:");
        assert_eq!(redact_url("postgres://db/contacts"), "postgres://db/contacts");
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let storage = Storage::open("memory:").await.unwrap();
        assert_eq!(storage.backend(), "memory");
        let repo = storage.repository();
        let id = repo.create("u1", NewContact::new("Jane")).await.unwrap();
        assert_eq!(repo.read("u1", id.as_str()).await.unwrap().name, "Jane");
        storage.close().await;
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let err = Storage::open("mysql://u:p@host/db").await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.to_string().contains("u:p"));
    }
}
