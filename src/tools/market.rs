//! Market data tools backed by Yahoo Finance
//!
//! Symbol lookup, last close and technical indicators. All three share one
//! pooled HTTP client.

use crate::error::AgentError;
use crate::tools::indicators::{rsi, sma, Trend};
use crate::tools::Tool;
use crate::Result;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Minimum sessions needed before indicators are reported
const MIN_TECHNICAL_SESSIONS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMatch {
    pub symbol: String,
    pub short_name: String,
    pub exchange: String,
}

/// Outcome of a symbol search
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolLookup {
    Found(SymbolMatch),
    NotFound,
    /// Yahoo answered with a non-200 status
    Unreachable(StatusCode),
}

pub const YAHOO_UNREACHABLE: &str = "Could not reach the Yahoo server.";

pub struct YahooFinanceClient {
    client: Client,
    search_url: String,
    chart_url: String,
}

impl YahooFinanceClient {
    pub fn new(search_url: String, chart_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.trim_end_matches('/').to_string(),
            chart_url: chart_url.trim_end_matches('/').to_string(),
        })
    }

    /// Best quote match for a company name.
    pub async fn search_symbol(&self, company_name: &str) -> Result<SymbolLookup> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", company_name),
                ("quotesCount", "1"),
                ("newsCount", "0"),
                ("enableFuzzyQuery", "false"),
                ("quotesQueryId", "tss_match_phrase_query"),
            ])
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Ok(SymbolLookup::Unreachable(response.status()));
        }

        let body: SearchResponse = response.json().await?;

        let found = body.quotes.into_iter().next().and_then(|quote| {
            let mut symbol = quote.symbol?;
            let exchange = quote.exchange.unwrap_or_else(|| "Unknown".to_string());

            if exchange == "IST" && !symbol.ends_with(".IS") {
                symbol.push_str(".IS");
            }

            Some(SymbolMatch {
                short_name: quote.shortname.unwrap_or_else(|| symbol.clone()),
                symbol,
                exchange,
            })
        });

        Ok(found.map_or(SymbolLookup::NotFound, SymbolLookup::Found))
    }

    /// Daily closes over `range` (e.g. `5d`, `1y`), oldest first, gaps skipped.
    pub async fn daily_closes(&self, ticker: &str, range: &str) -> Result<Vec<DailyClose>> {
        let url = format!("{}/{}", self.chart_url, ticker);

        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(ticker = %ticker, "Yahoo chart returned 404");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(AgentError::ToolError(format!(
                "Yahoo chart request for {} failed with status {}",
                ticker,
                response.status()
            )));
        }

        let body: ChartResponse = response.json().await?;

        let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let series = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let close = close?;
                let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(DailyClose { date, close })
            })
            .collect();

        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    symbol: Option<String>,
    shortname: Option<String>,
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn normalize_ticker(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_uppercase()
}

//
// ================= Tools =================
//

pub struct GetTickerSymbolTool {
    yahoo: Arc<YahooFinanceClient>,
}

impl GetTickerSymbolTool {
    pub fn new(yahoo: Arc<YahooFinanceClient>) -> Self {
        Self { yahoo }
    }
}

#[async_trait::async_trait]
impl Tool for GetTickerSymbolTool {
    fn name(&self) -> &'static str {
        "get_ticker_symbol"
    }

    fn description(&self) -> &'static str {
        "Identifies the stock ticker symbol for a public company. ALWAYS use this FIRST for company queries. Input: Company name (e.g., 'Aselsan')."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        match self.yahoo.search_symbol(argument.trim()).await? {
            SymbolLookup::Found(found) => Ok(format!(
                "Found Symbol: {} (Company: {}, Exchange: {})",
                found.symbol, found.short_name, found.exchange
            )),
            SymbolLookup::NotFound => Ok("Company/coin not found. Please check the name.".to_string()),
            SymbolLookup::Unreachable(status) => {
                warn!(status = %status, "Yahoo symbol search unavailable");
                Ok(YAHOO_UNREACHABLE.to_string())
            }
        }
    }
}

pub struct GetStockPriceTool {
    yahoo: Arc<YahooFinanceClient>,
}

impl GetStockPriceTool {
    pub fn new(yahoo: Arc<YahooFinanceClient>) -> Self {
        Self { yahoo }
    }
}

#[async_trait::async_trait]
impl Tool for GetStockPriceTool {
    fn name(&self) -> &'static str {
        "get_stock_price"
    }

    fn description(&self) -> &'static str {
        "Retrieves the current live price and currency of a specific ticker. Input: Ticker symbol (e.g., 'ASELS.IS')."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let ticker = normalize_ticker(argument);
        let closes = self.yahoo.daily_closes(&ticker, "5d").await?;

        match closes.last() {
            Some(last) => Ok(format!(
                "DATA:\nSymbol: {}\nDate: {}\nPrice: {:.2}",
                ticker,
                last.date.format("%Y-%m-%d"),
                last.close
            )),
            None => Ok(format!(
                "ERROR: no data for '{}'. The symbol may be wrong.",
                ticker
            )),
        }
    }
}

pub struct AnalyzeTechnicalDataTool {
    yahoo: Arc<YahooFinanceClient>,
}

impl AnalyzeTechnicalDataTool {
    pub fn new(yahoo: Arc<YahooFinanceClient>) -> Self {
        Self { yahoo }
    }
}

#[async_trait::async_trait]
impl Tool for AnalyzeTechnicalDataTool {
    fn name(&self) -> &'static str {
        "analyze_technical_data"
    }

    fn description(&self) -> &'static str {
        "Calculates technical indicators (RSI, SMA, Trend) for a ticker to assess market strength. Input: Ticker symbol."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let ticker = normalize_ticker(argument);
        let closes: Vec<f64> = self
            .yahoo
            .daily_closes(&ticker, "1y")
            .await?
            .into_iter()
            .map(|c| c.close)
            .collect();

        if closes.len() < MIN_TECHNICAL_SESSIONS {
            warn!(ticker = %ticker, sessions = closes.len(), "Not enough history for indicators");
            return Ok("Not enough data for technical analysis.".to_string());
        }

        Ok(render_technical_report(&ticker, &closes))
    }
}

fn render_technical_report(ticker: &str, closes: &[f64]) -> String {
    let price = closes.last().copied().unwrap_or_default();
    let sma_50 = sma(closes, 50);
    let sma_200 = sma(closes, 200);
    let trend = Trend::from_price(price, sma_200);

    let fmt_opt = |v: Option<f64>| {
        v.map(|x| format!("{:.2}", x))
            .unwrap_or_else(|| "N/A".to_string())
    };

    format!(
        "TECHNICAL ANALYSIS ({}):\nPrice: {:.2}\nRSI (14): {}\nSMA 50: {}\nSMA 200: {}\nTrend: {}",
        ticker,
        price,
        fmt_opt(rsi(closes, 14)),
        fmt_opt(sma_50),
        fmt_opt(sma_200),
        trend.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> Arc<YahooFinanceClient> {
        Arc::new(
            YahooFinanceClient::new(
                format!("{}/v1/finance/search", server.uri()),
                format!("{}/v8/finance/chart", server.uri()),
            )
            .unwrap(),
        )
    }

    fn chart_body(closes: &[Option<f64>]) -> serde_json::Value {
        let start = 1_735_689_600i64; // 2025-01-01
        let timestamps: Vec<i64> = (0..closes.len() as i64).map(|i| start + i * 86_400).collect();
        json!({
            "chart": {
                "result": [{
                    "timestamp": timestamps,
                    "indicators": { "quote": [{ "close": closes }] }
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn test_ticker_lookup_appends_istanbul_suffix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .and(query_param("q", "Aselsan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quotes": [{ "symbol": "ASELS", "shortname": "ASELSAN", "exchange": "IST" }]
            })))
            .mount(&server)
            .await;

        let tool = GetTickerSymbolTool::new(client_for(&server).await);
        let out = tool.execute("Aselsan").await.unwrap();
        assert_eq!(out, "Found Symbol: ASELS.IS (Company: ASELSAN, Exchange: IST)");
    }

    #[tokio::test]
    async fn test_ticker_lookup_without_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "quotes": [] })))
            .mount(&server)
            .await;

        let tool = GetTickerSymbolTool::new(client_for(&server).await);
        assert!(tool.execute("Nope Corp").await.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_ticker_lookup_server_error_is_reported_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let yahoo = client_for(&server).await;
        assert_eq!(
            yahoo.search_symbol("Aselsan").await.unwrap(),
            SymbolLookup::Unreachable(StatusCode::SERVICE_UNAVAILABLE)
        );

        let tool = GetTickerSymbolTool::new(yahoo);
        assert_eq!(tool.execute("Aselsan").await.unwrap(), YAHOO_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_stock_price_uses_last_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ASELS.IS"))
            .and(query_param("range", "5d"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chart_body(&[Some(220.0), None, Some(224.104)])),
            )
            .mount(&server)
            .await;

        let tool = GetStockPriceTool::new(client_for(&server).await);
        let out = tool.execute(" asels.is ").await.unwrap();
        assert!(out.contains("Symbol: ASELS.IS"));
        assert!(out.contains("Date: 2025-01-03"));
        assert!(out.contains("Price: 224.10"));
    }

    #[tokio::test]
    async fn test_stock_price_unknown_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/XXXX"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tool = GetStockPriceTool::new(client_for(&server).await);
        assert!(tool.execute("xxxx").await.unwrap().starts_with("ERROR"));
    }

    #[tokio::test]
    async fn test_technical_analysis_needs_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/THYAO.IS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(&vec![Some(10.0); 20])))
            .mount(&server)
            .await;

        let tool = AnalyzeTechnicalDataTool::new(client_for(&server).await);
        assert_eq!(
            tool.execute("THYAO.IS").await.unwrap(),
            "Not enough data for technical analysis."
        );
    }

    #[test]
    fn test_render_technical_report() {
        let closes: Vec<f64> = (1..=250).map(f64::from).collect();
        let report = render_technical_report("ASELS.IS", &closes);
        assert!(report.contains("Price: 250.00"));
        assert!(report.contains("RSI (14): 100.00"));
        assert!(report.contains("SMA 50: 225.50"));
        assert!(report.contains("Trend: UPTREND"));
    }

    #[test]
    fn test_render_technical_report_short_history() {
        let closes = vec![10.0; 60];
        let report = render_technical_report("X", &closes);
        assert!(report.contains("SMA 200: N/A"));
        assert!(report.contains("RSI (14): N/A"));
        assert!(report.contains("UNKNOWN"));
    }
}
