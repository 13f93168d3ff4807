//! Tool registry builder
//!
//! Assembles the registry of tools offered to the model: internet search,
//! calculator and clock. Search and the calculator fallback share the
//! provider the rest of the turn uses.

use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::providers::Provider;
use crate::tools::{
    CalculatorTool, ClockTool, SearchTool, ToolExecutor, ToolRegistry, CALCULATOR_TOOL,
    CLOCK_TOOL, SEARCH_TOOL,
};

/// Builder for the Aizen tool registry
///
/// # Examples
///
/// ```no_run
/// use aizen::tools::ToolRegistryBuilder;
/// use aizen::providers::{OllamaProvider, Provider};
/// use aizen::config::{OllamaConfig, ToolsConfig};
/// use std::sync::Arc;
///
/// let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(OllamaConfig::default()).unwrap());
/// let registry = ToolRegistryBuilder::new(provider)
///     .with_tools_config(ToolsConfig::default())
///     .build();
/// assert_eq!(registry.len(), 3);
/// ```
pub struct ToolRegistryBuilder {
    provider: Arc<dyn Provider>,
    tools_config: ToolsConfig,
}

impl ToolRegistryBuilder {
    /// Create a builder around the provider used by model-backed tools
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            tools_config: ToolsConfig::default(),
        }
    }

    /// Set the tools configuration
    pub fn with_tools_config(mut self, config: ToolsConfig) -> Self {
        self.tools_config = config;
        self
    }

    /// Build the registry with all three tools
    pub fn build(&self) -> ToolRegistry {
        let mut registry =
            ToolRegistry::new().with_max_output_size(self.tools_config.max_output_size);

        let search: Arc<dyn ToolExecutor> = Arc::new(SearchTool::new(self.provider.clone()));
        registry.register(SEARCH_TOOL, search);

        let calculator: Arc<dyn ToolExecutor> =
            Arc::new(CalculatorTool::new(self.provider.clone()));
        registry.register(CALCULATOR_TOOL, calculator);

        let clock: Arc<dyn ToolExecutor> = Arc::new(ClockTool::new(&self.tools_config));
        registry.register(CLOCK_TOOL, clock);

        tracing::debug!("Built tool registry with {} tools", registry.len());
        registry
    }
}
