use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use chrono::Utc;
use market_service::db::{self, PgCategoryStore, PgCommentStore, PgPostStore};
use market_service::middleware::JwtAuthMiddleware;
use market_service::neighborhood::{NeighborhoodGraph, ProximityResolver};
use market_service::openapi::ApiDoc;
use market_service::search::ElasticsearchSearchLog;
use market_service::services::GeocodingClient;
use market_service::storage::S3ImageStore;
use market_service::{AppState, Collaborators, Config};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

struct HealthState {
    db_pool: sqlx::PgPool,
    images: S3ImageStore,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "market-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "market-service"
        })),
    }
}

async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();
    let mut ready = true;

    let start = Instant::now();
    let pg_result = state.check_postgres().await;
    let pg_latency = Some(start.elapsed().as_millis() as u64);
    let postgres_check = match pg_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "PostgreSQL connection successful".to_string(),
            latency_ms: pg_latency,
        },
        Err(e) => {
            ready = false;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("PostgreSQL connection failed: {}", e),
                latency_ms: pg_latency,
            }
        }
    };
    checks.insert("postgresql".to_string(), postgres_check);

    // Image storage only degrades uploads, it does not take the service down.
    let start = Instant::now();
    let s3_result = state.images.health_check().await;
    let s3_latency = Some(start.elapsed().as_millis() as u64);
    let s3_check = match s3_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Image bucket reachable".to_string(),
            latency_ms: s3_latency,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Degraded,
            message: format!("Image bucket check failed: {}", e),
            latency_ms: s3_latency,
        },
    };
    checks.insert("s3".to_string(), s3_check);

    let status = if ready {
        ComponentStatus::Healthy
    } else {
        ComponentStatus::Unhealthy
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run_healthcheck(port: u16) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{}/api/v1/health", port);
    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .context("healthcheck HTTP error")?;

    if resp.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("healthcheck HTTP status: {}", resp.status())
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if let Some(cmd) = std::env::args().nth(1) {
        if cmd == "healthcheck" || cmd == "healthcheck-http" {
            let port = std::env::var("MARKET_SERVICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000);
            return run_healthcheck(port).await;
        }
    }

    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting market-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is empty; every bearer token will be rejected");
    }

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database pool created");

    db::MIGRATOR
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    let categories = Arc::new(PgCategoryStore::new(db_pool.clone()));
    {
        use market_service::db::CategoryStore;
        categories
            .seed_defaults()
            .await
            .context("Failed to seed categories")?;
    }

    let graph = NeighborhoodGraph::load(&config.neighborhood.data_path).with_context(|| {
        format!(
            "Failed to load neighborhood graph from {}",
            config.neighborhood.data_path
        )
    })?;
    let resolver = ProximityResolver::new(Arc::new(graph));

    let images = S3ImageStore::from_config(&config.storage).await;
    tracing::info!(bucket = %config.storage.bucket, "Image storage initialized");

    let search_log = ElasticsearchSearchLog::new(&config.search.url, &config.search.log_index)
        .context("Failed to initialize search-log client")?;
    tracing::info!(url = %config.search.url, "Search-log client initialized");

    let state = AppState::new(
        Collaborators {
            posts: Arc::new(PgPostStore::new(db_pool.clone())),
            comments: Arc::new(PgCommentStore::new(db_pool.clone())),
            categories,
            images: Arc::new(images.clone()),
            search_log: Arc::new(search_log),
        },
        resolver,
        config.feed.clone(),
        GeocodingClient::new(&config.geocoding),
    );

    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
        images,
    });
    let jwt = JwtAuthMiddleware::new(&config.auth.jwt_secret);
    let openapi_doc = ApiDoc::openapi();

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let cors_origins = config.cors.allowed_origins.clone();

    tracing::info!("Starting HTTP server on {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let api_state = state.clone();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url(ApiDoc::openapi_json_path(), openapi_doc.clone()),
            )
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(market_service::metrics::serve_metrics),
            )
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .service(
                web::scope("/api/v1")
                    .wrap(jwt.clone())
                    .configure(|cfg| api_state.configure(cfg)),
            )
    })
    .bind(&bind_address)?
    .workers(config.app.workers)
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => return Err(e).context("HTTP server failed"),
                Err(e) => return Err(e).context("HTTP server task panicked"),
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    db_pool.close().await;
    tracing::info!("Market-service shutting down");
    Ok(())
}
