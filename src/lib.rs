//! Financial Query Orchestrator
//!
//! Answers a natural-language financial question by fanning it out to
//! downstream services and synthesizing the result:
//! - Extracts tickers and topical keywords from the query
//! - Gathers market data, SEC filings and retrieved documents per ticker
//! - Requests an analysis, then a generated natural-language answer
//! - Optionally synthesizes the answer to speech
//!
//! PIPELINE:
//! PARSE → MARKET DATA → FILINGS → RETRIEVE → ANALYZE → GENERATE → SYNTHESIZE?

pub mod agent;
pub mod api;
pub mod assembler;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::Orchestrator;
pub use client::{HttpServiceClient, ServiceClient, ServiceRequest};
pub use config::OrchestratorConfig;
pub use parser::QueryParser;
