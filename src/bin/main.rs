use financial_query_orchestrator::{
    agent::Orchestrator,
    client::HttpServiceClient,
    config::OrchestratorConfig,
    error::OrchestrationError,
    models::{FinalResponse, OutputFormat},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: orchestrator [--voice] <query...>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut output_format = OutputFormat::Text;
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--voice" => output_format = OutputFormat::Voice,
            _ => words.push(arg),
        }
    }

    let query = words.join(" ");
    if query.trim().is_empty() {
        eprintln!("{}", USAGE);
        return Err(Box::new(OrchestrationError::InvalidRequest(
            "a query is required".to_string(),
        )) as Box<dyn std::error::Error>);
    }

    let config = OrchestratorConfig::from_env()?;
    let client = HttpServiceClient::from_config(&config)?;
    let orchestrator = Orchestrator::new(Box::new(client), config);

    info!(query = %query, %output_format, "Running orchestrator");

    let response = orchestrator.run(&query, output_format).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    match response {
        FinalResponse::Failed(failure) => Err(Box::new(
            OrchestrationError::AnalysisUnavailable(failure.details),
        ) as Box<dyn std::error::Error>),
        _ => Ok(()),
    }
}
