use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use accounts::{
    AppState, MIGRATOR, config::Settings, create_router, jwt::JwtService,
    repositories::PgAccountRepository,
};
use common::database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting accounts service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let pool = database::init_pool(&settings.database).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.database.run_migrations {
        database::run_migrations(&pool, &MIGRATOR).await?;
    }

    let jwt_service = JwtService::new(settings.jwt)?;
    let repository = Arc::new(PgAccountRepository::new(pool));
    let app_state = AppState::new(repository, jwt_service);

    info!("Accounts service initialized successfully");

    // Start the web server
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind_address).await?;
    info!("Accounts service listening on {}", settings.server.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
