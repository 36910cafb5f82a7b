//! Catalog of the Octagon agent tools and the result envelope they return.

use std::fmt;

use crate::errors::RelayError;

/// Description of the single `prompt` parameter every tool accepts.
pub const PROMPT_DESCRIPTION: &str = "Your natural language query or request for the agent";

/// An Octagon agent exposed as a named tool.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AgentTool {
    /// Orchestrates every agent for broad market intelligence.
    Agent,
    /// Extracts structured data from investor and financial websites.
    Scraper,
    /// Multi-source deep research.
    DeepResearch,
}

impl AgentTool {
    pub const ALL: [AgentTool; 3] = [Self::Agent, Self::Scraper, Self::DeepResearch];

    /// Tool name as registered with the host; also the backend model name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Agent => "octagon-agent",
            Self::Scraper => "octagon-scraper-agent",
            Self::DeepResearch => "octagon-deep-research-agent",
        }
    }

    /// Backend model that serves this tool.
    pub fn model(self) -> &'static str {
        self.name()
    }

    /// Resolves a tool by its registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Like [`AgentTool::from_name`], but an unknown name is a [`RelayError::UnknownTool`].
    pub fn resolve(name: &str) -> Result<Self, RelayError> {
        Self::from_name(name).ok_or_else(|| RelayError::UnknownTool(name.to_string()))
    }

    /// Phrase used in the error envelope ("Failed to process <context> query").
    pub fn failure_context(self) -> &'static str {
        match self {
            Self::Agent => "comprehensive market intelligence",
            Self::Scraper => "web scraping",
            Self::DeepResearch => "deep research",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Agent => concat!(
                "[COMPREHENSIVE MARKET INTELLIGENCE] Orchestrates all agents for comprehensive market intelligence analysis. ",
                "Capabilities: Combines insights from SEC filings, earnings calls, financial metrics, stock data, institutional holdings, ",
                "private company research, funding analysis, M&A transactions, investor intelligence, and debt analysis to provide holistic market intelligence. ",
                "Best for: Complex research requiring multiple data sources and comprehensive analysis across public and private markets. ",
                "Example queries: 'Analyze the latest 10-K filing for AAPL and extract key financial metrics and risk factors', ",
                "'Retrieve the daily closing prices for AAPL over the last 30 days', ",
                "'Provide a comprehensive overview of Stripe, including its business model and key metrics'."
            ),
            Self::Scraper => concat!(
                "[PUBLIC & PRIVATE MARKET INTELLIGENCE] Specialized agent for financial data extraction from investor websites. ",
                "Capabilities: Extract structured financial data from investor relations websites, tables, and online financial sources. ",
                "Best for: Gathering financial data from websites that don't have accessible APIs. ",
                "Example queries: 'Extract all data fields from zillow.com/san-francisco-ca/', 'Extract all data fields from www.carvana.com/cars/'."
            ),
            Self::DeepResearch => concat!(
                "[PUBLIC & PRIVATE MARKET INTELLIGENCE] A comprehensive agent that can utilize multiple sources for deep research analysis. ",
                "Capabilities: Aggregate research across multiple data sources, synthesize information, and provide comprehensive investment research. ",
                "Best for: Investment research questions requiring up-to-date aggregated information from the web. ",
                "Example queries: 'Research the financial impact of Apple's privacy changes on digital advertising companies' revenue and margins', ",
                "'Analyze the competitive landscape in the cloud computing sector, focusing on AWS, Azure, and Google Cloud margin and growth trends'."
            ),
        }
    }

    /// JSON schema of the tool input.
    pub fn input_schema(self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": PROMPT_DESCRIPTION }
            },
            "required": ["prompt"],
        })
    }
}

impl fmt::Display for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tool input.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PromptInput {
    pub prompt: String,
}

impl PromptInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.prompt.trim().is_empty() {
            return Err(RelayError::Validation("prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// One content item of a tool result.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Tool result envelope handed back to the host protocol.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Error envelope for a failed call of `tool`.
    pub fn failure(tool: AgentTool, err: &RelayError) -> Self {
        Self::error(format!(
            "Error: Failed to process {} query. {err}",
            tool.failure_context()
        ))
    }

    /// Concatenated text of all content items.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|ToolContent::Text { text }| text.as_str())
            .collect()
    }
}
