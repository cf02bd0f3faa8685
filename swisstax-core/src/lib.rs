pub mod calculations;
pub mod calculator;
pub mod db;
pub mod error;
pub mod models;
pub mod snapshot;

pub use calculator::TaxCalculator;
pub use db::{DbConfig, RateRepository, RepositoryError, RepositoryFactory, RepositoryRegistry};
pub use error::CalculationError;
pub use models::*;
pub use snapshot::{RateSnapshot, RateSnapshotBuilder};
