use financial_query_orchestrator::{
    agent::Orchestrator, api::start_server, client::HttpServiceClient, config::OrchestratorConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Financial Query Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Create components
    let config = OrchestratorConfig::from_env()?;
    let client = HttpServiceClient::from_config(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(Box::new(client), config));

    info!("Orchestrator initialized, starting API server");

    start_server(orchestrator, api_port).await?;

    Ok(())
}
