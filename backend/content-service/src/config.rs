//! Configuration management for the content pipeline service.
//!
//! All settings load from environment variables with development defaults.
//! External AI endpoints are optional: a missing URL means the concern runs
//! on its local fallback policy.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub budget: BudgetConfig,
    pub pipeline: PipelineConfig,
    pub trending: TrendingConfig,
    pub recommendation: RecommendationConfig,
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// External AI service endpoints. Each is optional; unset means the local
/// fallback policy applies for that concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub classifier: Option<AiEndpoint>,
    pub safety: Option<AiEndpoint>,
    pub positivity: Option<AiEndpoint>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

/// Rolling-window spend tracking for paid classifier calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub daily_limit_usd: f64,
    pub window_secs: u64,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
}

/// Background moderation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_depth: usize,
    pub max_attempts: u32,
    /// Hard ceiling on a single item's processing time.
    pub stage_timeout_secs: u64,
    /// Videos classified below this confidence go to human review.
    pub review_confidence_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingConfig {
    pub interval_secs: u64,
    pub startup_delay_secs: u64,
    pub max_per_element: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub cache_ttl_secs: u64,
    /// Candidate pool size as a multiple of the requested limit.
    pub pool_multiplier: usize,
    pub view_history_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub cache_ttl_secs: u64,
    pub max_candidates: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("CONTENT_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("CONTENT_SERVICE_PORT", 8084),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/lumen".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            },
            ai: AiConfig {
                classifier: parse_endpoint("CLASSIFIER"),
                safety: parse_endpoint("SAFETY"),
                positivity: parse_endpoint("POSITIVITY"),
                request_timeout_secs: env_or("AI_REQUEST_TIMEOUT_SECS", 30),
            },
            budget: BudgetConfig {
                daily_limit_usd: parse_env_or_default("BUDGET_DAILY_LIMIT_USD", 50.0)?,
                window_secs: env_or("BUDGET_WINDOW_SECS", 24 * 60 * 60),
                batch_size: env_or("CLASSIFY_BATCH_SIZE", 8),
                flush_interval_ms: env_or("CLASSIFY_FLUSH_INTERVAL_MS", 500),
            },
            pipeline: PipelineConfig {
                workers: env_or("PIPELINE_WORKERS", 4),
                queue_depth: env_or("PIPELINE_QUEUE_DEPTH", 256),
                max_attempts: env_or("PIPELINE_MAX_ATTEMPTS", 2),
                stage_timeout_secs: env_or("PIPELINE_STAGE_TIMEOUT_SECS", 120),
                review_confidence_threshold: parse_env_or_default(
                    "REVIEW_CONFIDENCE_THRESHOLD",
                    0.5,
                )? as f32,
            },
            trending: TrendingConfig {
                interval_secs: env_or("TRENDING_INTERVAL_SECS", 60 * 60),
                startup_delay_secs: env_or("TRENDING_STARTUP_DELAY_SECS", 30),
                max_per_element: env_or("TRENDING_MAX_PER_ELEMENT", 1_000),
            },
            recommendation: RecommendationConfig {
                cache_ttl_secs: env_or("RECOMMENDATION_CACHE_TTL_SECS", 4 * 60 * 60),
                pool_multiplier: env_or("RECOMMENDATION_POOL_MULTIPLIER", 3),
                view_history_limit: env_or("VIEW_HISTORY_LIMIT", 50),
            },
            feed: FeedConfig {
                cache_ttl_secs: env_or("FEED_CACHE_TTL_SECS", 120),
                max_candidates: env_or("FEED_MAX_CANDIDATES", 1_000),
            },
        })
    }
}

/// Build an optional AI endpoint from `<PREFIX>_API_URL` / `_API_KEY` /
/// `_MODEL`. A missing URL means the endpoint is not configured.
fn parse_endpoint(prefix: &str) -> Option<AiEndpoint> {
    let url = std::env::var(format!("{}_API_URL", prefix)).ok()?;
    if url.trim().is_empty() {
        return None;
    }

    Some(AiEndpoint {
        url,
        api_key: std::env::var(format!("{}_API_KEY", prefix)).unwrap_or_default(),
        model: std::env::var(format!("{}_MODEL", prefix))
            .unwrap_or_else(|_| "lumen-classify-small".to_string()),
    })
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_or_default(key: &str, default: f64) -> Result<f64, String> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.stage_timeout_secs, 120);
        assert_eq!(config.recommendation.cache_ttl_secs, 4 * 60 * 60);
        assert_eq!(config.trending.interval_secs, 3600);
        assert!((config.pipeline.review_confidence_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unset_endpoint_is_none() {
        std::env::remove_var("CLASSIFIER_API_URL");
        assert!(parse_endpoint("CLASSIFIER").is_none());
    }
}
