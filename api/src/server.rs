use crate::{create_router, AppState};
use tokio::task::JoinHandle;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Start the API server and serve until the listener fails
pub async fn start_server(
    state: AppState,
    config: ApiConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Inklog listening on {}", addr);
    info!("Swagger UI available at http://{}/api/swagger", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Start the API server in a background task
pub fn spawn_server(state: AppState, config: ApiConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = start_server(state, config).await {
            tracing::error!("API server error: {}", e);
        }
    })
}
