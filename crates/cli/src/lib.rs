// Library interface for the datadao command line tools
// This exposes the internal modules for testing and external use

pub mod cli;
pub mod config;
pub mod metadata;
pub mod store;

pub use config::AppConfig;
pub use metadata::DatasetMetadata;
