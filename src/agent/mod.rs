//! Main orchestrator - drives the query pipeline
//!
//! PARSE → MARKET DATA → FILINGS → RETRIEVE → ANALYZE → GENERATE → SYNTHESIZE?
//!
//! Calls run strictly one after another. Only the analysis step is fatal;
//! every other downstream failure degrades the answer instead of aborting it.

use crate::assembler;
use crate::client::{ServiceClient, ServiceRequest};
use crate::config::{OrchestratorConfig, ServiceUrls};
use crate::models::{
    is_truthy, value_to_text, AnalysisPayload, FinalResponse, MarketDataMap, OutputFormat,
    ParsedQuery, Payload, ServiceError, ServiceResult,
};
use crate::parser::QueryParser;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Main orchestrator that coordinates the downstream services
pub struct Orchestrator {
    client: Box<dyn ServiceClient>,
    parser: QueryParser,
    services: ServiceUrls,
    retrieval_top_k: usize,
}

impl Orchestrator {
    pub fn new(client: Box<dyn ServiceClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            parser: QueryParser::new(config.query_defaults),
            services: config.services,
            retrieval_top_k: config.retrieval_top_k,
        }
    }

    /// Run the full pipeline for one query. Always returns a structured
    /// response, even when the analysis step fails.
    pub async fn run(&self, query: &str, output_format: OutputFormat) -> FinalResponse {
        let span = info_span!("query", request_id = %Uuid::new_v4(), %output_format);
        self.run_inner(query, output_format).instrument(span).await
    }

    async fn run_inner(&self, query: &str, output_format: OutputFormat) -> FinalResponse {
        let start_time = Instant::now();
        info!(query = %query, "Orchestrator: received query");

        // === PARSE ===
        let parsed = self.parser.parse(query);

        // === MARKET DATA + FILINGS ===
        if parsed.tickers.is_empty() {
            info!("No tickers identified, skipping market data and filings");
        }
        let market_data = self.fetch_market_data(&parsed).await;
        let company_filings = self.fetch_filings(&parsed).await;

        // === RETRIEVE ===
        let news_articles = self.retrieve_documents(&parsed).await;

        // === ANALYZE ===
        let payload = assembler::build_analysis_payload(
            &parsed,
            &market_data,
            news_articles,
            company_filings,
        );
        let analysis = match self.request_analysis(&payload).await {
            Ok(analysis) => analysis,
            Err(details) => {
                warn!(details = %details, "Analysis service call failed, aborting");
                return FinalResponse::analysis_failed(details);
            }
        };

        // === GENERATE ===
        let text = self.generate_text(query, &analysis).await;

        // === SYNTHESIZE? ===
        let response = match output_format {
            OutputFormat::Text => assembler::text_response(text, analysis),
            OutputFormat::Voice => {
                info!("Synthesizing speech with voice service");
                let synthesis = self
                    .client
                    .call(
                        ServiceRequest::post(format!("{}/voice/synthesize/", self.services.voice))
                            .form_field("text", text.clone())
                            .raw(),
                    )
                    .await;
                assembler::voice_response(text, synthesis)
            }
        };

        info!(
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Orchestrator: query complete"
        );
        response
    }

    async fn fetch_market_data(&self, parsed: &ParsedQuery) -> MarketDataMap {
        let mut market_data = MarketDataMap::new();

        for ticker in &parsed.tickers {
            let url = format!("{}/{}", self.services.api, ticker);
            debug!(ticker = %ticker, url = %url, "Fetching stock data");

            let data = match self.client.call(ServiceRequest::get(url)).await {
                ServiceResult::Success(Payload::Json(body @ Value::Object(_))) => {
                    match ServiceResult::json(body).into_object() {
                        Ok(mut body) => body.remove("data").unwrap_or(Value::Object(body)),
                        Err(err) => {
                            warn!(ticker = %ticker, error = %err, "Failed to get stock data");
                            continue;
                        }
                    }
                }
                // Raw values are stored as-is.
                ServiceResult::Success(Payload::Json(value)) => value,
                ServiceResult::Success(Payload::Text(text)) => Value::String(text),
                ServiceResult::Success(Payload::Bytes(bytes)) => {
                    warn!(ticker = %ticker, bytes = bytes.len(), "Stock data was not JSON");
                    continue;
                }
                ServiceResult::Failure(err) => {
                    warn!(ticker = %ticker, error = %err, "Failed to get stock data");
                    continue;
                }
            };
            market_data.insert(ticker.clone(), data);
        }

        market_data
    }

    async fn fetch_filings(&self, parsed: &ParsedQuery) -> Vec<String> {
        let mut filings = Vec::new();

        for ticker in &parsed.tickers {
            let url = format!("{}/scrape/filings/{}", self.services.scraping, ticker);
            debug!(ticker = %ticker, "Fetching SEC filings");

            let items = match self.client.call(ServiceRequest::get(url)).await.into_object() {
                Ok(mut body) => match body.remove("filings") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        warn!(ticker = %ticker, "Filings response missing 'filings' list");
                        continue;
                    }
                },
                Err(err) => {
                    warn!(ticker = %ticker, error = %err, "Failed to get SEC filings");
                    continue;
                }
            };

            filings.extend(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|filing| assembler::format_filing(ticker, filing)),
            );
            info!(ticker = %ticker, entries = items.len(), "Processed filing metadata");
        }

        filings
    }

    async fn retrieve_documents(&self, parsed: &ParsedQuery) -> Vec<String> {
        let terms = parsed.retrieval_terms();
        if terms.is_empty() {
            debug!("No retrieval terms, skipping vector search");
            return Vec::new();
        }

        let retrieval_query = terms.join(" ");
        info!(query = %retrieval_query, "Searching vector store");

        let result = self
            .client
            .call(
                ServiceRequest::post(format!("{}/search", self.services.retriever)).json(json!({
                    "query": retrieval_query,
                    "top_k": self.retrieval_top_k,
                })),
            )
            .await;

        match result.into_object() {
            Ok(body) => match body.get("results").and_then(Value::as_array) {
                Some(results) => {
                    let documents: Vec<String> = results
                        .iter()
                        .map(|doc| {
                            doc.get("text")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string()
                        })
                        .collect();
                    info!(count = documents.len(), "Retrieved documents from vector store");
                    documents
                }
                None => {
                    warn!("Retriever response missing 'results' list");
                    Vec::new()
                }
            },
            Err(err) => {
                warn!(error = %err, "Failed to retrieve documents");
                Vec::new()
            }
        }
    }

    /// The one fatal step: any failure here ends the run.
    async fn request_analysis(
        &self,
        payload: &AnalysisPayload,
    ) -> std::result::Result<Value, String> {
        info!(
            news = payload.news_articles.len(),
            filings = payload.company_filings.len(),
            "Sending data to analysis service"
        );

        let body = serde_json::to_value(payload).map_err(|e| e.to_string())?;
        debug!(
            payload = %serde_json::to_string_pretty(&body).unwrap_or_default(),
            "Analysis payload"
        );

        let result = self
            .client
            .call(
                ServiceRequest::post(format!("{}/analysis/market_data", self.services.analysis))
                    .json(body),
            )
            .await;

        match result.into_object() {
            Ok(analysis) if analysis.is_empty() => Err("No response".to_string()),
            Ok(analysis) => Ok(Value::Object(analysis)),
            Err(ServiceError { error, .. }) => Err(error),
        }
    }

    /// Ask the language service for the answer, falling back to the raw
    /// analysis so the response always carries text.
    async fn generate_text(&self, query: &str, analysis: &Value) -> String {
        info!("Generating final response with language service");
        let prompt = assembler::build_generation_prompt(query, analysis);

        let result = self
            .client
            .call(
                ServiceRequest::post(format!("{}/language/generate", self.services.language))
                    .json(json!({ "prompt": prompt })),
            )
            .await;

        match result.into_object() {
            Ok(body) => match body.get("response").filter(|v| is_truthy(v)) {
                Some(response) => value_to_text(response),
                None => {
                    warn!("Language service returned no content");
                    assembler::fallback_text(analysis)
                }
            },
            Err(err) => {
                warn!(error = %err, "Language service call failed");
                assembler::fallback_text(analysis)
            }
        }
    }
}
