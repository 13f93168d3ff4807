//! Internet search tool
//!
//! Answers a query with a single model call that responds as a knowledge base
//! would. There is no retry: an empty answer is `NoInformation`, a provider
//! failure is `Error`.

use super::{Sentinels, ToolExecutor, ToolResult, SEARCH_TOOL};
use crate::error::Result;
use crate::prompts::search_prompt;
use crate::providers::{complete_text, Provider};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Sentinels rendered for failed searches
pub const SEARCH_SENTINELS: Sentinels = Sentinels {
    no_information:
        "The path of inquiry led to stillness; no specific information was found on this matter.",
    error: "A disturbance in the flow of knowledge prevented the search. My apologies.",
};

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// Model-backed search tool
pub struct SearchTool {
    provider: Arc<dyn Provider>,
}

impl SearchTool {
    /// Create a search tool that queries the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Look up a query directly
    ///
    /// Never fails; failures are reported as tagged results.
    pub async fn search(&self, query: &str) -> ToolResult {
        let query = query.trim();
        if query.is_empty() {
            return ToolResult::no_information();
        }

        tracing::debug!("Searching for: {}", query);
        match complete_text(self.provider.as_ref(), None, &search_prompt(query)).await {
            Ok(Some(answer)) => ToolResult::found(answer),
            Ok(None) => ToolResult::no_information(),
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                ToolResult::error(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for SearchTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": SEARCH_TOOL,
            "description": "Find information on current events, facts, details about specific places (e.g. \"tell me about Paris\"), technical topics such as computer science and engineering, or anything else that needs up-to-date knowledge. Returns a concise answer. Call at most once per turn.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query or question to find information about."
                    }
                },
                "required": ["query"]
            }
        })
    }

    fn sentinels(&self) -> &'static Sentinels {
        &SEARCH_SENTINELS
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let args: SearchArgs = serde_json::from_value(args)?;
        Ok(self.search(&args.query).await)
    }
}
