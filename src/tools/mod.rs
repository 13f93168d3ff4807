//! What the model may call while composing a reply: `internet_search`,
//! `calculate` and `get_time`, plus the registry that dispatches to them.
//!
//! Tool outcomes are tagged internally (`ToolResult`). They become the fixed
//! persona sentinel strings only when rendered into conversation content.

pub mod calculator;
pub mod clock;
pub mod registry_builder;
pub mod search;

pub use calculator::CalculatorTool;
pub use clock::ClockTool;
pub use registry_builder::ToolRegistryBuilder;
pub use search::SearchTool;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the search tool as seen by the model
pub const SEARCH_TOOL: &str = "internet_search";
/// Name of the calculator tool as seen by the model
pub const CALCULATOR_TOOL: &str = "calculate";
/// Name of the clock tool as seen by the model
pub const CLOCK_TOOL: &str = "get_time";

/// Why a tool produced no answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The tool ran but had nothing to say
    NoInformation,
    /// The tool failed; the detail is for logs only
    Error(String),
}

/// Outcome of a tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// An answer was produced
    Found(String),
    /// No answer was produced
    Failed(ToolFailure),
}

/// Fixed user-facing strings a tool substitutes for its failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    /// Rendered for `ToolFailure::NoInformation`
    pub no_information: &'static str,
    /// Rendered for `ToolFailure::Error`
    pub error: &'static str,
}

impl ToolResult {
    /// Create a found result; blank text counts as no information
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::tools::{ToolResult, ToolFailure};
    ///
    /// assert_eq!(ToolResult::found(" 4 "), ToolResult::Found("4".to_string()));
    /// assert_eq!(ToolResult::found("  "), ToolResult::Failed(ToolFailure::NoInformation));
    /// ```
    pub fn found(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Failed(ToolFailure::NoInformation)
        } else {
            Self::Found(trimmed.to_string())
        }
    }

    /// Create a no-information result
    pub fn no_information() -> Self {
        Self::Failed(ToolFailure::NoInformation)
    }

    /// Create an error result
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Failed(ToolFailure::Error(detail.into()))
    }

    /// Whether an answer was produced
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Metrics/log label for the outcome
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::Failed(ToolFailure::NoInformation) => "no_information",
            Self::Failed(ToolFailure::Error(_)) => "error",
        }
    }

    /// Truncate a found answer that exceeds the maximum size
    ///
    /// Cuts on a character boundary at or below `max_size` bytes.
    pub fn truncate_if_needed(self, max_size: usize) -> Self {
        match self {
            Self::Found(mut text) if text.len() > max_size => {
                let mut cut = max_size;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
                text.push_str("\n... (truncated)");
                Self::Found(text)
            }
            other => other,
        }
    }

    /// Render the result as conversation content
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::tools::{Sentinels, ToolResult};
    ///
    /// let sentinels = Sentinels { no_information: "nothing", error: "broken" };
    /// assert_eq!(ToolResult::found("42").render(&sentinels), "42");
    /// assert_eq!(ToolResult::no_information().render(&sentinels), "nothing");
    /// assert_eq!(ToolResult::error("timeout").render(&sentinels), "broken");
    /// ```
    pub fn render(&self, sentinels: &Sentinels) -> String {
        match self {
            Self::Found(text) => text.clone(),
            Self::Failed(ToolFailure::NoInformation) => sentinels.no_information.to_string(),
            Self::Failed(ToolFailure::Error(_)) => sentinels.error.to_string(),
        }
    }
}

/// One callable tool
///
/// # Examples
///
/// ```no_run
/// use aizen::tools::{Sentinels, ToolExecutor, ToolResult};
/// use aizen::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct EchoTool;
///
/// const ECHO_SENTINELS: Sentinels = Sentinels { no_information: "silence", error: "noise" };
///
/// #[async_trait]
/// impl ToolExecutor for EchoTool {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "echo",
///             "description": "Repeats its input",
///             "parameters": {"type": "object", "properties": {"text": {"type": "string"}}}
///         })
///     }
///
///     fn sentinels(&self) -> &'static Sentinels {
///         &ECHO_SENTINELS
///     }
///
///     async fn execute(&self, args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::found(args["text"].as_str().unwrap_or_default()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The definition has `name`, `description` and a JSON schema under
    /// `parameters`; providers convert it to their own wire format.
    fn tool_definition(&self) -> serde_json::Value;

    /// The strings rendered in place of this tool's failures
    fn sentinels(&self) -> &'static Sentinels;

    /// Run with the model-supplied arguments
    ///
    /// An `Err` here is not fatal; the registry downgrades it to
    /// `ToolFailure::Error`.
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Tools by name, with a cap on how much of an answer reaches the model
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
    max_output_size: usize,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            max_output_size: crate::config::ToolsConfig::default().max_output_size,
        }
    }

    pub fn with_max_output_size(mut self, max_output_size: usize) -> Self {
        self.max_output_size = max_output_size;
        self
    }

    /// Replaces any tool already registered under `name`
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Schemas offered to the model, ordered by name
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|executor| executor.tool_definition())
            .collect()
    }

    /// Run a tool and return its tagged result, untruncated
    ///
    /// Executor errors are folded into `ToolFailure::Error`. The call is
    /// logged and counted.
    ///
    /// # Errors
    ///
    /// Returns error only when no tool with this name is registered
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> Result<ToolResult> {
        let executor = self.get(name).ok_or_else(|| {
            crate::error::AizenError::Tool(format!("Unknown tool: {}", name))
        })?;

        let result = match executor.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, "Tool execution failed: {}", e);
                ToolResult::error(e.to_string())
            }
        };

        if let ToolResult::Failed(ToolFailure::Error(detail)) = &result {
            tracing::warn!(tool = name, "Tool reported failure: {}", detail);
        }
        tracing::debug!(tool = name, outcome = result.outcome_label(), "Tool finished");
        crate::agent::metrics::record_tool_call(name, result.outcome_label());

        Ok(result)
    }

    /// Run a tool and render the outcome as content for the model
    ///
    /// Found answers are capped at the configured output size.
    ///
    /// # Errors
    ///
    /// Returns error only when no tool with this name is registered
    pub async fn execute_rendered(&self, name: &str, args: serde_json::Value) -> Result<String> {
        let result = self
            .execute(name, args)
            .await?
            .truncate_if_needed(self.max_output_size);
        let sentinels = self
            .get(name)
            .map(|executor| *executor.sentinels())
            .ok_or_else(|| crate::error::AizenError::Tool(format!("Unknown tool: {}", name)))?;
        Ok(result.render(&sentinels))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
