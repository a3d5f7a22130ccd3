use taxi_forecast::config::Settings;
use taxi_forecast::context::AppContext;
use taxi_forecast::web::{AppState, create_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", settings.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut context = AppContext::new(settings).expect("Failed to create HTTP client");
    context.start_background();

    let state = AppState::new(context.pipeline.clone(), context.cache.clone())
        .with_message_limit(context.settings.message_limit);
    let app = create_router(state);

    let addr = context.settings.bind_addr;
    info!(
        %addr,
        timezone = %context.settings.timezone,
        hafas = context.settings.sources.hafas.access_id.is_some(),
        "taxi forecast listening"
    );
    info!("  GET  /health        - Health check");
    info!("  GET  /report/:mode  - Report for now or tomorrow");
    info!("  POST /command       - Chat-style command");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
