/// Symbol catalog for one venue
///
/// Fetched once per exchange; filtering is pure client-side work over the
/// cached list, re-derived on every keystroke with no network round-trip.
use tracing::info;

use crate::error::ApiError;
use crate::rest::MarketApi;

#[derive(Debug, Clone)]
pub struct SymbolCatalog {
    exchange: String,
    symbols: Vec<String>,
}

impl SymbolCatalog {
    /// Fetch the tradable pairs for `exchange`.
    pub async fn load(api: &MarketApi, exchange: &str) -> Result<Self, ApiError> {
        let symbols = api.fetch_symbols(exchange).await?;
        info!(exchange, count = symbols.len(), "loaded symbol catalog");
        Ok(Self {
            exchange: exchange.to_string(),
            symbols,
        })
    }

    /// Build from an already-known list (tests, offline fixtures).
    pub fn from_symbols(exchange: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            exchange: exchange.into(),
            symbols,
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Case-insensitive substring filter plus optional quote-asset suffix
    /// (e.g. `quote = Some("USDT")` keeps only `*/USDT` pairs).
    pub fn filter(&self, query: &str, quote: Option<&str>) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        let quote_suffix = quote.map(|q| format!("/{}", q.to_lowercase()));

        self.symbols
            .iter()
            .filter(|symbol| {
                let lower = symbol.to_lowercase();
                (query.is_empty() || lower.contains(&query))
                    && quote_suffix
                        .as_ref()
                        .map_or(true, |suffix| lower.ends_with(suffix))
            })
            .map(String::as_str)
            .collect()
    }
}
