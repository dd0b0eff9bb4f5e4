use mock_server::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let state = match std::env::var("TB_APP_SECRET") {
        Ok(secret) if !secret.is_empty() => AppState::with_app_secret(&secret),
        _ => AppState::default(),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    mock_server::run_with_state(listener, state).await
}
