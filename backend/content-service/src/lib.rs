/// Content Pipeline Service
///
/// Owns the content lifecycle for the Lumen platform: classification into
/// the five-element taxonomy, safety screening, positivity scoring,
/// moderation decisioning, human review resolution, trending computation,
/// feed ranking, hybrid recommendations and audit logging.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers for the exposed operations
/// - `models`: Content, queue, trending and audit data structures
/// - `services`: Classifiers, decision policy, derived read paths
/// - `db`: The `ContentStore` boundary and its Postgres implementation
/// - `cache`: In-process TTL caches for feed and recommendation results
/// - `pipeline`: Bounded worker pool running the moderation orchestrator
/// - `jobs`: Periodic trending recompute
/// - `error`: Error types and HTTP mapping
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
