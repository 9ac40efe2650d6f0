// End-to-end loop scenarios through the public API: scripted provider,
// in-memory tool host, config-derived options.

use async_trait::async_trait;
use corral_core::agent::{Agent, AgentOptions, BudgetKind, TerminationReason};
use corral_core::config::AgentConfig;
use corral_core::model::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, StopReason,
};
use corral_core::telemetry::init_tracing;
use corral_core::tooling::{ToolExecutor, ToolInvokeError, ToolOutput, ToolRegistry, ToolSchema};
use corral_core::types::{Block, Role, Turn};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

struct ScriptedProvider {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ProviderError::fatal("script exhausted"))
    }
}

struct WeatherHost;

#[async_trait]
impl ToolExecutor for WeatherHost {
    async fn call(&self, tool: &str, arguments: Value) -> Result<ToolOutput, ToolInvokeError> {
        match (tool, arguments.get("city").and_then(Value::as_str)) {
            ("get_weather", Some("Boston")) => Ok(ToolOutput::new("sunny, 80F")),
            ("get_weather", Some(city)) => Ok(ToolOutput::new(format!("no data for {city}"))),
            (tool, _) => Err(ToolInvokeError::execution(tool, "missing city")),
        }
    }
}

fn tools() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new().with_tool(
        ToolSchema::new(
            "get_weather",
            "Current weather for a city",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        ),
        Arc::new(WeatherHost),
    ))
}

fn weather_call(id: &str) -> CompletionResponse {
    CompletionResponse::new(
        vec![Block::tool_use(id, "get_weather", json!({"city": "Boston"}))],
        StopReason::ToolUse,
        12,
    )
}

fn answer(text: &str) -> CompletionResponse {
    CompletionResponse::new(vec![Block::text(text)], StopReason::EndTurn, 8)
}

fn options_from(toml: &str) -> AgentOptions {
    let config = AgentConfig::from_toml_str(toml).expect("valid config");
    AgentOptions::from(&config)
}

#[tokio::test]
async fn scenario_a_tool_result_follows_tool_use() {
    init_tracing(Some("corral_core=debug"));
    let provider = ScriptedProvider::new(vec![weather_call("toolu_01"), answer("Sunny and 80F.")]);
    let agent = Agent::new(provider.clone(), tools());

    let outcome = agent
        .run("What is the weather in Boston?", &CancellationToken::new())
        .await
        .expect("session runs");

    assert_eq!(
        outcome.conversation[..3],
        [
            Turn::user_text("What is the weather in Boston?"),
            Turn::new(
                Role::Assistant,
                vec![Block::tool_use("toolu_01", "get_weather", json!({"city": "Boston"}))]
            ),
            Turn::new(Role::User, vec![Block::tool_result("toolu_01", "sunny, 80F")]),
        ]
    );
    assert_eq!(provider.request_count().await, 2);
    assert_eq!(outcome.reason, TerminationReason::NaturalCompletion);
}

#[tokio::test]
async fn scenario_b_runaway_call_is_stopped() {
    let provider = ScriptedProvider::new(vec![
        weather_call("t1"),
        weather_call("t2"),
        weather_call("t3"),
        weather_call("t4"),
    ]);
    let agent = Agent::new(provider.clone(), tools()).with_options(options_from(""));

    let outcome = agent
        .run("Weather?", &CancellationToken::new())
        .await
        .expect("session runs");

    assert_eq!(outcome.reason.as_str(), "REPEATED_CALL_DETECTED");
    assert_eq!(provider.request_count().await, 3);
    assert_eq!(outcome.steps.len(), 2);
}

#[tokio::test]
async fn scenario_c_token_budget() {
    let provider = ScriptedProvider::new(vec![
        CompletionResponse::new(
            vec![Block::tool_use("t1", "get_weather", json!({"city": "Boston"}))],
            StopReason::ToolUse,
            1025,
        ),
        answer("never reached"),
    ]);
    let agent = Agent::new(provider.clone(), tools())
        .with_options(options_from("[limits]\nmax_total_output_tokens = 1024\n"));

    let outcome = agent
        .run("Weather?", &CancellationToken::new())
        .await
        .expect("session runs");

    assert_eq!(
        outcome.reason,
        TerminationReason::BudgetExceeded(BudgetKind::OutputTokens)
    );
    assert_eq!(provider.request_count().await, 1);
}

#[tokio::test]
async fn scenario_d_natural_completion() {
    let provider = ScriptedProvider::new(vec![answer("Hello there.")]);
    let agent = Agent::new(provider, tools());

    let outcome = agent
        .run("Hi", &CancellationToken::new())
        .await
        .expect("session runs");

    assert_eq!(outcome.reason, TerminationReason::NaturalCompletion);
    assert_eq!(outcome.final_response().as_deref(), Some("Hello there."));
}

#[tokio::test]
async fn scenario_d_interactive_waits_for_user() {
    let provider = ScriptedProvider::new(vec![answer("Hello there."), answer("Goodbye.")]);
    let agent = Agent::new(provider.clone(), tools())
        .with_options(options_from("[conversation]\nend_of_conversation = \"bye\"\n"));
    let (sender, mut receiver) = mpsc::channel(4);

    let driver = tokio::spawn(async move {
        sender.send("Thanks!".to_string()).await.expect("send");
        sender.send("BYE".to_string()).await.expect("send");
    });

    let outcome = agent
        .run_interactive("Hi", &mut receiver, &CancellationToken::new())
        .await
        .expect("session runs");
    driver.await.expect("driver finished");

    assert_eq!(outcome.reason, TerminationReason::UserEnded);
    assert_eq!(provider.request_count().await, 2);
    assert_eq!(outcome.conversation[2], Turn::user_text("Thanks!"));
}

#[tokio::test]
async fn configured_extractor_feeds_entity_memory() {
    let provider = ScriptedProvider::new(vec![weather_call("t1"), answer("Sunny.")]);
    let config = AgentConfig::from_toml_str(
        "[[extractors]]\ntool = \"get_weather\"\nentity_field = \"city\"\nattribute = \"weather\"\n",
    )
    .expect("valid config");
    let agent = Agent::new(provider, tools())
        .with_extractors(Arc::new(config.entity_extractors()))
        .with_options(AgentOptions::from(&config));

    let outcome = agent
        .run("Weather in Boston?", &CancellationToken::new())
        .await
        .expect("session runs");

    assert_eq!(
        outcome.entities.as_prompt_context(),
        "Known facts from earlier in this session:\n- Boston: weather=sunny, 80F\n"
    );
}

#[tokio::test]
async fn sessions_on_one_agent_run_in_parallel_tasks() {
    let provider = ScriptedProvider::new(vec![answer("first"), answer("second")]);
    let agent = Arc::new(Agent::new(provider.clone(), tools()));

    let handles: Vec<_> = (0..2)
        .map(|index| {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .run(format!("question {index}"), &CancellationToken::new())
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.expect("task joins").expect("session runs");
        assert_eq!(outcome.reason, TerminationReason::NaturalCompletion);
        assert_eq!(outcome.conversation.len(), 2);
        ids.push(outcome.session_id);
    }
    assert_ne!(ids[0], ids[1]);
    assert_eq!(provider.request_count().await, 2);
}
