//! Reference-data loading and command-line plumbing for the swisstax
//! workspace.

pub mod config;
pub mod loader;
pub mod logging;

pub use config::{AppConfig, ConfigError};
pub use loader::{
    IncomeBracketLoader, IncomeBracketLoaderError, IncomeBracketRecord, MunicipalityLoader,
    MunicipalityLoaderError, MunicipalityRecord,
};
pub use logging::init_logging;
