use chrono::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use klassflow_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{PgSignatureStore, TokenStore},
    utils::time,
};

/// Deletes unused signature tokens that expired longer ago than the retention window.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_cleanup=info,klassflow_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    let store = PgSignatureStore::new(pool.clone());

    let cutoff = time::now_utc(&config.time_zone)
        - Duration::days(config.signature_token_retention_days);
    let deleted = store.delete_expired_tokens(cutoff).await?;
    if deleted > 0 {
        tracing::info!(%cutoff, "Deleted {} expired signature tokens", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) signature_tokens")
        .execute(&pool)
        .await?;

    Ok(())
}
