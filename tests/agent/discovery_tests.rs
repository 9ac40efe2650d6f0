// Schema discovery and enrichment: tools listed by a host reach the provider
// with overlay descriptions applied.

use async_trait::async_trait;
use corral_core::agent::Agent;
use corral_core::config::AgentConfig;
use corral_core::model::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, StopReason,
};
use corral_core::tooling::{
    ToolExecutor, ToolInvokeError, ToolOutput, ToolRegistry, ToolSchema, ToolSchemaSource,
};
use corral_core::types::Block;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct FinanceHost;

#[async_trait]
impl ToolSchemaSource for FinanceHost {
    async fn list(&self) -> Result<Vec<ToolSchema>, ToolInvokeError> {
        Ok(vec![
            ToolSchema::new(
                "get_stock_price",
                "Latest price for a ticker",
                json!({
                    "type": "object",
                    "properties": {"symbol": {"type": "string"}},
                    "required": ["symbol"]
                }),
            ),
            ToolSchema::new(
                "get_budget",
                "Remaining budget",
                json!({"type": "object", "properties": ["team"]}),
            ),
        ])
    }
}

#[async_trait]
impl ToolExecutor for FinanceHost {
    async fn call(&self, tool: &str, arguments: Value) -> Result<ToolOutput, ToolInvokeError> {
        match tool {
            "get_stock_price" => Ok(ToolOutput::new(json!({
                "symbol": arguments["symbol"],
                "price": 412.3
            }))),
            other => Err(ToolInvokeError::execution(other, "not available")),
        }
    }
}

struct UnreachableHost;

#[async_trait]
impl ToolSchemaSource for UnreachableHost {
    async fn list(&self) -> Result<Vec<ToolSchema>, ToolInvokeError> {
        Err(ToolInvokeError::transport("connection refused"))
    }
}

#[derive(Default)]
struct RecordingProvider {
    requests: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionProvider for RecordingProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut requests = self.requests.lock().await;
        requests.push(request);
        let response = if requests.len() == 1 {
            CompletionResponse::new(
                vec![Block::tool_use("s1", "get_stock_price", json!({"symbol": "MSFT"}))],
                StopReason::ToolUse,
                15,
            )
        } else {
            CompletionResponse::new(vec![Block::text("MSFT trades at 412.3.")], StopReason::EndTurn, 9)
        };
        Ok(response)
    }
}

fn overlay_config() -> AgentConfig {
    AgentConfig::from_toml_str(
        r#"
[schema_overlay.get_stock_price]
symbol = "Ticker symbol, e.g. AAPL"

[schema_overlay.get_budget]
team = "Team name"
"#,
    )
    .expect("valid config")
}

#[tokio::test]
async fn discovered_tools_carry_overlay_descriptions() {
    let config = overlay_config();
    let host = Arc::new(FinanceHost);
    let mut registry = ToolRegistry::new();

    let count = registry
        .discover(host.as_ref(), host.clone(), &config.schema_overlay)
        .await
        .expect("discovery succeeds");

    assert_eq!(count, 2);
    let schemas = registry.schemas();
    assert_eq!(
        schemas[0].input_schema["properties"]["symbol"]["description"],
        "Ticker symbol, e.g. AAPL"
    );
    assert_eq!(
        schemas[1].input_schema,
        json!({"type": "object", "properties": ["team"]})
    );
}

#[tokio::test]
async fn discovery_failure_is_reported() {
    let mut registry = ToolRegistry::new();
    let error = registry
        .discover(&UnreachableHost, Arc::new(FinanceHost), &overlay_config().schema_overlay)
        .await
        .expect_err("listing fails");

    assert!(error.to_string().contains("connection refused"));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn provider_sees_enriched_schemas_and_tool_output() {
    let config = overlay_config();
    let host = Arc::new(FinanceHost);
    let mut registry = ToolRegistry::new();
    registry
        .discover(host.as_ref(), host.clone(), &config.schema_overlay)
        .await
        .expect("discovery succeeds");
    let provider = Arc::new(RecordingProvider::default());
    let agent = Agent::new(provider.clone(), Arc::new(registry));

    let outcome = agent
        .run("How is MSFT doing?", &CancellationToken::new())
        .await
        .expect("session runs");

    let requests = provider.requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].tools[0].input_schema["properties"]["symbol"]["description"],
        "Ticker symbol, e.g. AAPL"
    );
    assert_eq!(
        outcome.conversation[2].blocks,
        vec![Block::tool_result("s1", r#"{"price":412.3,"symbol":"MSFT"}"#)]
    );
    assert_eq!(outcome.final_response().as_deref(), Some("MSFT trades at 412.3."));
}
