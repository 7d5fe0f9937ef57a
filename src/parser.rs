//! Query parser
//!
//! Turns a free-text financial question into a [`ParsedQuery`]:
//! ticker-like tokens, topical keywords and the configured default intent.
//! Ticker detection is a word heuristic, so real symbols that collide with
//! stopwords (e.g. "GOOD", "HOLD") are never extracted.

use crate::config::QueryDefaults;
use crate::models::ParsedQuery;
use std::collections::BTreeSet;
use tracing::debug;

const MIN_TICKER_LEN: usize = 2;
const MAX_TICKER_LEN: usize = 5;

/// Words that look like tickers but are not
const NON_TICKER_WORDS: &[&str] = &[
    "RISK", "ASIA", "TODAY", "WHAT", "OUR", "AND", "ANY", "FOR", "INC", "LLC",
    "THE", "ARE", "YOU", "FROM", "STOCK", "STOCKS", "MARKET", "NEWS",
    "EARNINGS", "SURPRISE", "EXPOSURE", "CURRENT", "RECENT", "HIGHLIGHT",
    "COMPANY", "COMPANIES", "TECH", "FINANCE", "INVESTMENT", "PORTFOLIO",
    "DATA", "INFO", "INFORMATION", "PLEASE", "THANKS", "THANK", "HELLO", "GOOD",
    "MORNING", "AFTERNOON", "EVENING", "IS", "AM", "PM", "CALL", "PUT", "OPTION", "OPTIONS",
    "BUY", "SELL", "HOLD", "PRICE", "TARGET", "ANALYSIS", "ANALYST", "REPORT",
    "TOMORROW", "YESTERDAY", "WEEK", "MONTH", "YEAR", "QUARTER", "ANNUAL",
    "HOW", "WHY", "WHEN", "WHERE", "WHICH", "WHO", "WILL", "CAN", "COULD", "SHOULD", "WOULD",
    "ME", "MY", "MINE", "YOUR", "YOURS", "HIM", "HIS", "HER", "HERS", "ITS", "WE", "US",
    "THEM", "THEIR", "THEIRS", "THIS", "THAT", "THESE", "THOSE", "A", "AN", "IN", "ON", "AT",
    "OF", "TO", "WITH", "BY", "AS", "BE", "HAS", "HAVE", "HAD", "DO", "DOES", "DID", "NOT",
];

pub struct QueryParser {
    defaults: QueryDefaults,
}

impl QueryParser {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self { defaults }
    }

    pub fn parse(&self, query: &str) -> ParsedQuery {
        let upper_query = query.to_uppercase();

        let tickers: BTreeSet<String> = query
            .split_whitespace()
            .filter_map(ticker_candidate)
            .collect();

        let mut keywords = Vec::new();
        if upper_query.contains("RISK") {
            keywords.push("risk".to_string());
        }
        let has_surprise = upper_query.contains("SURPRISE");
        if upper_query.contains("EARNINGS") || has_surprise {
            keywords.push("earnings".to_string());
            if has_surprise {
                keywords.push("surprise".to_string());
            }
        }
        if tickers.is_empty() && upper_query.contains("ASIA TECH") {
            keywords.push("asia tech stocks".to_string());
        }

        let parsed = ParsedQuery {
            tickers,
            keywords,
            intent: self.defaults.intent.clone(),
            target_info: self.defaults.target_info.clone(),
        };

        debug!(
            tickers = ?parsed.tickers,
            keywords = ?parsed.keywords,
            "Parsed query elements"
        );

        parsed
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(QueryDefaults::default())
    }
}

/// Strip a whitespace token down to its alphanumerics and keep it if it
/// looks like a ticker.
fn ticker_candidate(token: &str) -> Option<String> {
    let cleaned: String = token.chars().filter(|c| c.is_alphanumeric()).collect();

    let len = cleaned.chars().count();
    if !(MIN_TICKER_LEN..=MAX_TICKER_LEN).contains(&len) {
        return None;
    }

    // Mixed-case tokens like "AbC" are prose, not symbols.
    if cleaned.chars().any(char::is_lowercase) || !cleaned.chars().any(char::is_uppercase) {
        return None;
    }

    if cleaned.chars().all(char::is_numeric) {
        return None;
    }

    if NON_TICKER_WORDS.contains(&cleaned.as_str()) {
        return None;
    }

    Some(cleaned)
}
