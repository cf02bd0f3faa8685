use std::path::PathBuf;

use async_trait::async_trait;
use swisstax_core::db::{DbConfig, RateRepository, RepositoryError, RepositoryFactory};
use tracing::debug;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime.
///
/// Resolution order:
/// 1. **`SWISSTAX_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if it exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** for runs from the build tree.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SWISSTAX_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`swisstax_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use swisstax_core::db::RepositoryRegistry;
/// use swisstax_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database named by `config.connection_string` and apply
    /// migrations. A database with no jurisdiction configured is then seeded
    /// from [`seeds_dir`]; existing reference data is left untouched.
    ///
    /// Accepted connection strings are a bare file path (created if
    /// missing), a sqlx URL such as `sqlite:rates.db?mode=rwc`, or
    /// `":memory:"`.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn RateRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        let seeded = repo
            .has_reference_data()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        if seeded {
            debug!("reference data present, skipping seeds");
        } else {
            repo.run_seeds(&seeds_dir())
                .await
                .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        }
        Ok(Box::new(repo))
    }
}
