use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_service::cache::{FeedCache, RecommendationCache};
use content_service::db::{ContentStore, PgContentStore};
use content_service::handlers::{
    self, AnalyticsHandlerState, DiscoveryHandlerState, ModerationHandlerState,
};
use content_service::jobs::TrendingRefreshJob;
use content_service::pipeline::ModerationWorkerPool;
use content_service::services::{
    ClassificationBatcher, CostTracker, ElementClassifier, FeedService,
    HttpClassificationProvider, HttpPositivityProvider, HttpSafetyProvider, ModerationService,
    PositivityScorer, RecommendationService, SafetyScreener, TrendingCalculator,
};

struct HealthState {
    db_pool: sqlx::Pool<sqlx::Postgres>,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "content-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "content-service"
        })),
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match content_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting content-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Initialize database connection pool
    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
        tracing::error!("Migration failed: {}", e);
        return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
    }
    tracing::info!("Migrations completed");

    let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(db_pool.clone()));

    // Budget guard and external AI clients. Missing endpoints mean the
    // local fallback policy applies for that concern.
    let cost_tracker = Arc::new(CostTracker::new(
        config.budget.daily_limit_usd,
        config.budget.window_secs,
    ));

    let mut batcher_handle = None;
    let batcher = match &config.ai.classifier {
        Some(endpoint) => {
            let provider = HttpClassificationProvider::new(
                endpoint.clone(),
                config.ai.request_timeout_secs,
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            let batcher = ClassificationBatcher::new(
                Arc::new(provider),
                cost_tracker.clone(),
                config.budget.batch_size,
                Duration::from_millis(config.budget.flush_interval_ms),
            );
            batcher_handle = Some(batcher.clone().spawn_flush_loop());
            tracing::info!(model = %endpoint.model, "External classifier configured");
            Some(batcher)
        }
        None => {
            tracing::warn!("No external classifier configured; keyword fallback only");
            None
        }
    };

    let safety_provider = match &config.ai.safety {
        Some(endpoint) => {
            tracing::info!(model = %endpoint.model, "External safety service configured");
            Some(Arc::new(
                HttpSafetyProvider::new(endpoint.clone(), config.ai.request_timeout_secs)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
            ) as Arc<dyn content_service::services::safety::SafetyProvider>)
        }
        None => {
            tracing::warn!("No safety service configured; content treated as safe by policy");
            None
        }
    };

    let positivity_provider = match &config.ai.positivity {
        Some(endpoint) => Some(Arc::new(
            HttpPositivityProvider::new(endpoint.clone(), config.ai.request_timeout_secs)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
        )
            as Arc<dyn content_service::services::positivity::PositivityProvider>),
        None => {
            tracing::warn!("No positivity service configured; keyword scoring only");
            None
        }
    };

    let classifier = Arc::new(ElementClassifier::new(batcher, cost_tracker.clone()));
    let screener = Arc::new(SafetyScreener::new(safety_provider));
    let scorer = Arc::new(PositivityScorer::new(positivity_provider));

    // In-memory caches, injected into the services that need them.
    let feed_cache = Arc::new(FeedCache::new(config.feed.cache_ttl_secs));
    let recommendation_cache = Arc::new(RecommendationCache::new(
        config.recommendation.cache_ttl_secs,
    ));

    let moderation = Arc::new(ModerationService::new(
        store.clone(),
        classifier,
        screener,
        scorer,
        feed_cache.clone(),
        recommendation_cache.clone(),
        config.pipeline.review_confidence_threshold,
    ));

    let worker_pool = Arc::new(ModerationWorkerPool::start(
        moderation.clone(),
        &config.pipeline,
    ));

    let feed_service = Arc::new(FeedService::new(
        store.clone(),
        feed_cache,
        config.feed.max_candidates,
    ));
    let recommendation_service = Arc::new(RecommendationService::new(
        store.clone(),
        recommendation_cache,
        config.recommendation.pool_multiplier,
        config.recommendation.view_history_limit,
    ));

    let trending_job = TrendingRefreshJob::new(
        Arc::new(TrendingCalculator::new(
            store.clone(),
            config.trending.max_per_element,
        )),
        config.trending.interval_secs,
        config.trending.startup_delay_secs,
    );

    let moderation_state = web::Data::new(ModerationHandlerState {
        workers: worker_pool,
        moderation,
        store: store.clone(),
    });
    let discovery_state = web::Data::new(DiscoveryHandlerState {
        feed: feed_service,
        recommendations: recommendation_service,
        store: store.clone(),
    });
    let analytics_state = web::Data::new(AnalyticsHandlerState { store });
    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        cors = cors.allow_any_origin().allow_any_method().allow_any_header();

        App::new()
            .app_data(moderation_state.clone())
            .app_data(discovery_state.clone())
            .app_data(analytics_state.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(content_service::metrics::serve_metrics),
            )
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/moderation")
                            .route(
                                "/submissions",
                                web::post().to(handlers::submit_for_moderation),
                            )
                            .route("/resolutions", web::post().to(handlers::resolve_content))
                            .route("/queue", web::get().to(handlers::get_moderation_queue)),
                    )
                    .route("/feed/{element}", web::get().to(handlers::get_feed))
                    .route("/trending/{element}", web::get().to(handlers::get_trending))
                    .route(
                        "/recommendations/{element}",
                        web::get().to(handlers::get_recommendations),
                    )
                    .route(
                        "/content/{content_type}/{content_id}/views",
                        web::post().to(handlers::track_view),
                    )
                    .route(
                        "/analytics/overview",
                        web::get().to(handlers::get_analytics_overview),
                    ),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    tasks.spawn(async move {
        trending_job.run().await;
        Ok(())
    });

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        if first_error.is_none() {
                            first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        }
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    if let Some(handle) = batcher_handle {
        handle.abort();
    }

    // In-flight moderation jobs are abandoned; every decision is a single
    // atomic row write, so no item is left in an inconsistent status pair.
    tracing::info!("Content-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
