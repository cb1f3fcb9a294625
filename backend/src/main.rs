use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use klassflow_backend::{
    build_router,
    config::Config,
    db::connection::create_pool,
    repositories::PgSignatureStore,
    services::{EmailNotifier, LogNotifier, SignatureNotifier},
    state::AppState,
    utils::email::EmailService,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

fn build_notifier() -> anyhow::Result<Arc<dyn SignatureNotifier>> {
    if std::env::var("SMTP_HOST").map_or(true, |host| host.trim().is_empty()) {
        tracing::warn!("SMTP_HOST not set; signature requests will only be logged");
        return Ok(Arc::new(LogNotifier));
    }
    Ok(Arc::new(EmailNotifier::new(EmailService::new()?)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klassflow_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        time_zone = %config.time_zone,
        app_base_url = %config.app_base_url,
        cors_allow_origins = ?config.cors_allow_origins,
        signature_resend_ttl_minutes = config.signature_resend_ttl_minutes,
        signature_request_grace_hours = config.signature_request_grace_hours,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(
        Arc::new(PgSignatureStore::new(pool)),
        build_notifier()?,
        config,
    );
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
