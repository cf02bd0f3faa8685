//! SQLite storage for the published rate tables.
//!
//! Decimal values are stored as TEXT and parsed exactly on read; see
//! [`decimal`].

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::{seeds_dir, SqliteRepositoryFactory};
pub use repository::SqliteRepository;
