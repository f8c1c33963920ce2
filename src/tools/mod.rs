//! Tool trait and registry
//!
//! Every tool takes one string argument and returns observation text.
//! Expected "no data" situations are reported as `Ok` text so the model can
//! react to them; `Err` is reserved for real failures.

pub mod csv_analysis;
pub mod indicators;
pub mod knowledge;
pub mod market;
pub mod search;

use crate::config::AppConfig;
use crate::knowledge::KnowledgeRetriever;
use crate::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub use csv_analysis::{AnalyzeFullCsvTool, ReadCsvPreviewTool};
pub use knowledge::QueryKnowledgeBaseTool;
pub use market::{AnalyzeTechnicalDataTool, GetStockPriceTool, GetTickerSymbolTool, YahooFinanceClient};
pub use search::WebSearchTool;

/// Trait for a single named capability
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, argument: &str) -> Result<String>;
}

/// Tool registry for looking up and executing tools
///
/// Registration order is kept so the prompt lists tools the same way every run.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `name: description` lines in registration order.
    pub fn descriptions(&self) -> String {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// File path argument with surrounding whitespace and quotes removed.
pub fn normalize_path(argument: &str) -> PathBuf {
    PathBuf::from(argument.trim().trim_matches('"').trim_matches('\'').trim())
}

/// Registry with the full research toolset.
pub fn create_default_registry(
    config: &AppConfig,
    retriever: Arc<KnowledgeRetriever>,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let yahoo = Arc::new(YahooFinanceClient::new(
        config.yahoo_search_url.clone(),
        config.yahoo_chart_url.clone(),
    )?);

    registry.register(Arc::new(WebSearchTool::new(
        config.serper_api_key.clone(),
        config.search_region.clone(),
        config.search_language.clone(),
    )?));
    registry.register(Arc::new(GetTickerSymbolTool::new(yahoo.clone())));
    registry.register(Arc::new(GetStockPriceTool::new(yahoo.clone())));
    registry.register(Arc::new(AnalyzeTechnicalDataTool::new(yahoo)));
    registry.register(Arc::new(QueryKnowledgeBaseTool::new(
        retriever,
        config.knowledge_top_k,
    )));
    registry.register(Arc::new(ReadCsvPreviewTool));
    registry.register(Arc::new(AnalyzeFullCsvTool));

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echoes its input."
        }

        async fn execute(&self, argument: &str) -> Result<String> {
            Ok(argument.to_string())
        }
    }

    struct UpperTool;

    #[async_trait::async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn description(&self) -> &'static str {
            "Uppercases its input."
        }

        async fn execute(&self, argument: &str) -> Result<String> {
            Ok(argument.to_uppercase())
        }
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(UpperTool));

        assert_eq!(registry.list(), vec!["upper", "echo"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.descriptions(),
            "upper: Uppercases its input.\necho: Echoes its input."
        );
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = ToolRegistry::default();
        registry.register(Arc::new(EchoTool));

        let tool = registry.get("echo").unwrap();
        assert_eq!(tool.execute("hi").await.unwrap(), "hi");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("  \"data/a.csv\" "), PathBuf::from("data/a.csv"));
        assert_eq!(normalize_path("'b.csv'"), PathBuf::from("b.csv"));
    }
}
