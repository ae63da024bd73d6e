use axum::Router;
use farrier_route::config::Config;
use farrier_route::db::{AppointmentRepository, PgAppointmentRepository};
use farrier_route::services::reasoning::{OpenAiClient, ReasoningBackend};
use farrier_route::services::route_optimizer::EnhancedOptimizer;
use farrier_route::services::stop_loader::StopLoader;
use farrier_route::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farrier_route=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting farrier route API server");
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    tracing::info!("Connecting to appointment store...");
    let db_pool = farrier_route::db::create_pool(&config.database_url).await?;
    tracing::info!("Appointment store connection established");

    // The schema belongs to the appointment store; only local setups run these
    if config.run_migrations {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Database migrations completed");
    }

    // Initialize services
    let repo: Arc<dyn AppointmentRepository> = Arc::new(PgAppointmentRepository::new(db_pool));
    let loader = StopLoader::new(repo.clone(), config.route.utc_offset);

    let backend: Option<Arc<dyn ReasoningBackend>> = match OpenAiClient::from_config(&config.optimizer)
    {
        Some(client) => {
            tracing::info!(
                model = %config.optimizer.openai_model,
                "Route optimizer configured ({})",
                config.optimizer.openai_model
            );
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!(
                "OPENAI_API_KEY not set. Route optimization will serve the fixed-interval fallback."
            );
            None
        }
    };
    let optimizer = EnhancedOptimizer::new(
        loader,
        backend,
        config.route.clone(),
        &config.optimizer,
    );

    // Create application state
    let state = Arc::new(AppState { repo, optimizer });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", farrier_route::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
