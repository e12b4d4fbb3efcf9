use mock_server::AppKeys;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "1337".to_string());
    let keys = AppKeys {
        application_id: std::env::var("PARSE_APPLICATION_ID").unwrap_or_else(|_| "dev-app".to_string()),
        rest_api_key: std::env::var("PARSE_REST_API_KEY").unwrap_or_else(|_| "dev-key".to_string()),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    mock_server::run(listener, keys).await
}
