//! Response assembly
//!
//! Pure helpers that shape what the sequencer sends and returns: filing
//! descriptions, the analysis payload, the generation prompt and the final
//! text/voice responses.

use crate::models::{
    AnalysisPayload, FinalResponse, MarketDataMap, ParsedQuery, Payload, ServiceResult,
    TextResponse, VoiceResponse, AUDIO_CONTENT_TYPE,
};
use serde_json::{Map, Value};
use tracing::{info, warn};

const FALLBACK_PREFIX: &str = "Could not generate a natural language summary. Raw analysis: ";

/// Format one filing item into a single description line.
pub fn format_filing(ticker: &str, filing: &Map<String, Value>) -> String {
    let field = |key: &str, default: &str| -> String {
        match filing.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    };

    format!(
        "Filing for {} ({} on {}): {}. URL: {}",
        ticker,
        field("form_type", "N/A"),
        field("filing_date", "N/A"),
        field("description", "N/A"),
        field("document_url", "#"),
    )
}

/// Build the analysis payload; market info and company ticker always come
/// from the first ticker in sorted order.
pub fn build_analysis_payload(
    parsed: &ParsedQuery,
    market_data: &MarketDataMap,
    news_articles: Vec<String>,
    company_filings: Vec<String>,
) -> AnalysisPayload {
    let primary = parsed.primary_ticker();

    AnalysisPayload {
        market_info: primary.and_then(|t| market_data.get(t)).cloned(),
        news_articles,
        company_filings,
        company_ticker: primary.map(str::to_string),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Prompt for the language service, embedding the query and full analysis.
pub fn build_generation_prompt(user_query: &str, analysis: &Value) -> String {
    format!(
        r#"You are a financial assistant. Generate a concise, direct natural language answer to the user's query based on the analysis results below.

User Query: '{query}'

Analysis Results (JSON):
{analysis}

Instructions for response generation:
- Read every section of the Analysis Results, especially 'earnings_analysis' and its 'summary_status', 'confidence' and 'details' fields.
- For earnings, treat 'earnings_analysis.summary_status' as the primary source.
  - If 'summary_status' gives specifics (e.g. 'EPS beat expectations by X%', 'Net income decreased Y%'), state them clearly.
  - If 'summary_status' is generic (e.g. 'No clear earnings surprise identified'), report that, then briefly add anything from 'details' or elsewhere in the results that it does not already cover.
  - Always mention the 'confidence' level of the earnings analysis when it is provided.
- Also weigh 'risk_assessment' and 'market_sentiment' for a complete answer.
- Synthesize a single helpful response about risk and earnings instead of repeating the raw analysis."#,
        query = user_query,
        analysis = pretty(analysis),
    )
}

/// Text used when the language service produced nothing usable.
pub fn fallback_text(analysis: &Value) -> String {
    format!("{}{}", FALLBACK_PREFIX, pretty(analysis))
}

pub fn text_response(text: String, analysis: Value) -> FinalResponse {
    FinalResponse::Text(TextResponse {
        text_response: text,
        analysis_details: analysis,
    })
}

fn voice_error(text: String, error: &str, status_code: u16) -> FinalResponse {
    FinalResponse::Voice(VoiceResponse {
        text_response: text,
        voice_response_bytes: None,
        content_type: None,
        error: Some(error.to_string()),
        status_code: Some(status_code),
    })
}

/// Shape the synthesis outcome; the text answer is kept on every path.
pub fn voice_response(text: String, synthesis: ServiceResult) -> FinalResponse {
    match synthesis {
        ServiceResult::Failure(err) => {
            warn!(error = %err.error, "Voice service call failed");
            voice_error(
                text,
                "Failed to synthesize voice due to service call error.",
                err.status_code,
            )
        }
        ServiceResult::Success(Payload::Bytes(bytes)) if bytes.is_empty() => {
            warn!("Voice service returned empty audio data");
            voice_error(text, "Voice synthesis returned empty audio.", 500)
        }
        ServiceResult::Success(Payload::Bytes(bytes)) => {
            info!(bytes = bytes.len(), "Voice synthesis successful");
            FinalResponse::Voice(VoiceResponse {
                text_response: text,
                voice_response_bytes: Some(bytes),
                content_type: Some(AUDIO_CONTENT_TYPE.to_string()),
                error: None,
                status_code: None,
            })
        }
        ServiceResult::Success(other) => {
            warn!(payload = ?other, "Voice service returned non-audio payload");
            voice_error(text, "Voice synthesis failed to return audio data.", 500)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use crate::parser::QueryParser;
    use serde_json::json;

    #[test]
    fn test_format_filing_with_defaults() {
        let filing = json!({"form_type": "10-K", "description": "Annual report"});
        let line = format_filing("AAPL", filing.as_object().unwrap());
        assert_eq!(
            line,
            "Filing for AAPL (10-K on N/A): Annual report. URL: #"
        );
    }

    #[test]
    fn test_payload_uses_first_ticker() {
        let parsed = QueryParser::default().parse("MSFT vs AAPL");
        let mut market = MarketDataMap::new();
        market.insert("AAPL".to_string(), json!({"price": 1}));
        market.insert("MSFT".to_string(), json!({"price": 2}));

        let payload = build_analysis_payload(&parsed, &market, vec![], vec![]);
        assert_eq!(payload.company_ticker.as_deref(), Some("AAPL"));
        assert_eq!(payload.market_info, Some(json!({"price": 1})));
    }

    #[test]
    fn test_payload_without_tickers_is_null() {
        let parsed = QueryParser::default().parse("risk in asia tech");
        let payload = build_analysis_payload(
            &parsed,
            &MarketDataMap::new(),
            vec!["doc".to_string()],
            vec![],
        );

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["company_ticker"], Value::Null);
        assert_eq!(value["market_info"], Value::Null);
        assert_eq!(value["news_articles"], json!(["doc"]));
    }

    #[test]
    fn test_prompt_embeds_query_and_analysis() {
        let analysis = json!({"earnings_analysis": {"summary_status": "EPS beat by 4%"}});
        let prompt = build_generation_prompt("How did TSMC do?", &analysis);

        assert!(prompt.contains("User Query: 'How did TSMC do?'"));
        assert!(prompt.contains("EPS beat by 4%"));
        assert!(prompt.contains("summary_status"));
        assert!(prompt.contains("confidence"));
        assert!(prompt.contains("risk_assessment"));
        assert!(prompt.contains("market_sentiment"));
    }

    #[test]
    fn test_fallback_embeds_serialized_analysis() {
        let analysis = json!({"risk_assessment": "moderate"});
        let text = fallback_text(&analysis);
        assert!(text.starts_with(FALLBACK_PREFIX));
        assert!(text.contains("\"risk_assessment\": \"moderate\""));
    }

    #[test]
    fn test_voice_response_branches() {
        let ok = voice_response("hi".to_string(), ServiceResult::bytes(vec![1, 2, 3]));
        assert_eq!(ok.error(), None);

        let empty = voice_response("hi".to_string(), ServiceResult::bytes(Vec::new()));
        match empty {
            FinalResponse::Voice(v) => {
                assert_eq!(v.status_code, Some(500));
                assert!(v.voice_response_bytes.is_none());
                assert_eq!(v.text_response, "hi");
            }
            other => panic!("unexpected {:?}", other),
        }

        let failed = voice_response(
            "hi".to_string(),
            ServiceResult::failure(FailureKind::HttpStatus, "503 Service Unavailable", 503),
        );
        match failed {
            FinalResponse::Voice(v) => {
                assert_eq!(v.status_code, Some(503));
                assert!(v.error.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let not_audio = voice_response("hi".to_string(), ServiceResult::json(json!({})));
        assert_eq!(not_audio.error(), Some("Voice synthesis failed to return audio data."));
    }
}
