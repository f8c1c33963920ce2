//! Knowledge base lookup tool

use crate::knowledge::KnowledgeRetriever;
use crate::tools::Tool;
use crate::Result;
use std::sync::Arc;

pub struct QueryKnowledgeBaseTool {
    retriever: Arc<KnowledgeRetriever>,
    top_k: usize,
}

impl QueryKnowledgeBaseTool {
    pub fn new(retriever: Arc<KnowledgeRetriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }
}

#[async_trait::async_trait]
impl Tool for QueryKnowledgeBaseTool {
    fn name(&self) -> &'static str {
        "query_knowledge_base"
    }

    fn description(&self) -> &'static str {
        "Searches the financial theory library for concepts, definitions, and strategies (e.g., 'What is P/E ratio?', 'How to interpret RSI?'). Input: The question."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let evidence = self.retriever.retrieve(argument, self.top_k).await?;
        Ok(format!("KNOWLEDGE BASE:\n{}", evidence))
    }
}
