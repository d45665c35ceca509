pub mod cleaner;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod persistence;
pub mod report;
pub mod topic_store;
pub mod trend_store;
pub mod types;
