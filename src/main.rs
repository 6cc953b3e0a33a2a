use flaira::config::AppConfig;
use flaira::db::init_pool;
use flaira::error::AppError;
use flaira::routes::create_router;
use flaira::services::{geo::GeoClient, mailer::Mailer, storage::MediaStore};
use flaira::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(AppError::Other(err.into()));
    }

    let media = MediaStore::new(config.media_root.clone());
    media.ensure_structure().await?;

    let geo = GeoClient::new(&config)?;
    let mailer = Mailer::new(&config)?;

    let state = AppState::new(config.clone(), db.clone(), media, geo, mailer);

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,flaira=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
