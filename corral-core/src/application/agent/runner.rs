use super::errors::AgentError;
use super::governor::SafetyGovernor;
use super::input::UserInput;
use super::models::{AgentOptions, SessionOutcome, TerminationReason};
use crate::conversation::ConversationStore;
use crate::entity::{EntityExtractors, EntityStore, parse_entity_markers};
use crate::model::{CompletionProvider, CompletionRequest, CompletionResponse, StopReason};
use crate::retry::{RetryError, RetryPolicy, with_retry};
use crate::tooling::{DispatchOutcome, ToolCall, ToolCallKey, ToolDispatcher, ToolRegistry, ToolStep};
use crate::types::{Block, Turn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Loop controller. One `Agent` may drive many sessions at once; every
/// counter lives in the per-run session state.
pub struct Agent<P: CompletionProvider> {
    provider: Arc<P>,
    tools: Arc<ToolRegistry>,
    extractors: Arc<EntityExtractors>,
    options: AgentOptions,
}

enum LoopState {
    AwaitingCompletion,
    HandlingBlocks(CompletionResponse),
    CheckTermination(TurnSummary),
    AwaitingUserInput,
    Terminated(TerminationReason),
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingCompletion => "awaiting_completion",
            LoopState::HandlingBlocks(_) => "handling_blocks",
            LoopState::CheckTermination(_) => "check_termination",
            LoopState::AwaitingUserInput => "awaiting_user_input",
            LoopState::Terminated(_) => "terminated",
        }
    }
}

struct TurnSummary {
    stop_reason: StopReason,
    tool_used: bool,
    repeated: Option<ToolCallKey>,
}

struct Session<'a> {
    id: String,
    conversation: ConversationStore,
    entities: EntityStore,
    governor: SafetyGovernor,
    dispatcher: ToolDispatcher<'a>,
    steps: Vec<ToolStep>,
}

impl<P: CompletionProvider> Agent<P> {
    pub fn new(provider: Arc<P>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            extractors: Arc::new(EntityExtractors::new()),
            options: AgentOptions::default(),
        }
    }

    pub fn with_extractors(mut self, extractors: Arc<EntityExtractors>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Runs one session to completion without asking for follow-up input.
    pub async fn run(
        &self,
        prompt: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, AgentError> {
        self.drive(prompt.into(), None, cancel).await
    }

    /// Runs one session, asking `input` for the next user turn whenever the
    /// model finishes without calling a tool.
    pub async fn run_interactive(
        &self,
        prompt: impl Into<String>,
        input: &mut dyn UserInput,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, AgentError> {
        self.drive(prompt.into(), Some(input), cancel).await
    }

    async fn drive(
        &self,
        prompt: String,
        mut input: Option<&mut dyn UserInput>,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::EmptyPrompt);
        }

        let no_retry = RetryPolicy::none();
        let tool_retry = self.options.tool_retry.as_ref().unwrap_or(&no_retry);
        let mut session = Session {
            id: Uuid::new_v4().to_string(),
            conversation: ConversationStore::new(),
            entities: EntityStore::new(),
            governor: SafetyGovernor::new(self.options.limits),
            dispatcher: ToolDispatcher::new(
                &self.tools,
                &self.extractors,
                tool_retry,
                self.options.repeat_threshold,
            ),
            steps: Vec::new(),
        };
        let interactive = input.is_some();
        info!(
            session = %session.id,
            interactive,
            tools = self.tools.len(),
            "Agent session started"
        );
        session.conversation.append_user(prompt);

        let mut state = LoopState::AwaitingCompletion;
        let reason = loop {
            state = match state {
                LoopState::AwaitingCompletion => self.await_completion(&mut session, cancel).await,
                LoopState::HandlingBlocks(response) => {
                    self.handle_blocks(&mut session, response, cancel).await
                }
                LoopState::CheckTermination(turn) => {
                    self.check_termination(&session, turn, interactive)
                }
                LoopState::AwaitingUserInput => match input.as_mut() {
                    Some(input) => self.await_user_input(&mut session, &mut **input, cancel).await,
                    None => LoopState::Terminated(TerminationReason::NaturalCompletion),
                },
                LoopState::Terminated(reason) => break reason,
            };
            debug!(session = %session.id, state = state.name(), "Loop transition");
        };

        let usage = session.governor.usage();
        if reason.is_graceful() {
            info!(
                session = %session.id,
                reason = reason.as_str(),
                iterations = usage.iterations,
                output_tokens = usage.output_tokens,
                "Agent session finished"
            );
        } else {
            warn!(
                session = %session.id,
                reason = %reason,
                iterations = usage.iterations,
                output_tokens = usage.output_tokens,
                "Agent session terminated early"
            );
        }

        Ok(SessionOutcome {
            session_id: session.id,
            reason,
            conversation: session.conversation.get_messages(),
            entities: session.entities,
            usage,
            steps: session.steps,
        })
    }

    async fn await_completion(
        &self,
        session: &mut Session<'_>,
        cancel: &CancellationToken,
    ) -> LoopState {
        if cancel.is_cancelled() {
            return LoopState::Terminated(TerminationReason::Cancelled);
        }
        if let Some(kind) = session.governor.exhausted() {
            return LoopState::Terminated(TerminationReason::BudgetExceeded(kind));
        }

        session.governor.begin_iteration();
        let request = CompletionRequest {
            system_prompt: self.options.system_prompt.clone(),
            messages: self.assemble_messages(session),
            tools: self.tools.schemas(),
            max_output_tokens: self.options.max_output_tokens,
        };
        debug!(
            session = %session.id,
            iteration = session.governor.usage().iterations,
            messages = request.messages.len(),
            "Submitting turn to completion provider"
        );

        let provider = self.provider.as_ref();
        let result = with_retry(&self.options.provider_retry, cancel, "completion", move || {
            provider.complete(request.clone())
        })
        .await;

        match result {
            Ok(response) => {
                session
                    .governor
                    .record_output_tokens(response.usage.output_tokens);
                debug!(
                    session = %session.id,
                    blocks = response.content.len(),
                    stop_reason = ?response.stop_reason,
                    output_tokens = response.usage.output_tokens,
                    "Completion received"
                );
                LoopState::HandlingBlocks(response)
            }
            Err(RetryError::Cancelled) => LoopState::Terminated(TerminationReason::Cancelled),
            Err(failure) => {
                error!(session = %session.id, error = %failure, "Completion provider failed");
                LoopState::Terminated(TerminationReason::FatalProviderError {
                    message: failure.to_string(),
                })
            }
        }
    }

    /// History (or its configured window) with the entity context turn in
    /// front when there is anything to say.
    fn assemble_messages(&self, session: &Session<'_>) -> Vec<Turn> {
        let history = match self.options.history_window {
            Some(window) => session.conversation.recent(window),
            None => session.conversation.get_messages(),
        };
        let context = session.entities.as_prompt_context();
        if context.is_empty() {
            return history;
        }
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Turn::user_text(context));
        messages.extend(history);
        messages
    }

    async fn handle_blocks(
        &self,
        session: &mut Session<'_>,
        response: CompletionResponse,
        cancel: &CancellationToken,
    ) -> LoopState {
        let CompletionResponse {
            content,
            stop_reason,
            ..
        } = response;
        let mut pending = Vec::new();
        let mut tool_used = false;
        let mut repeated = None;

        for block in content {
            match block {
                Block::Text { text } => {
                    for fact in parse_entity_markers(&text) {
                        debug!(entity = %fact.entity, key = %fact.key, "Recording reported fact");
                        session.entities.upsert(&fact.entity, &fact.key, fact.value);
                    }
                    pending.push(Block::Text { text });
                }
                Block::ToolUse { id, name, input } => {
                    let call = ToolCall { id, name, input };
                    let outcome = session
                        .dispatcher
                        .dispatch(
                            call,
                            &mut pending,
                            &mut session.conversation,
                            &mut session.entities,
                            cancel,
                        )
                        .await;
                    match outcome {
                        DispatchOutcome::Executed(step) => {
                            tool_used = true;
                            session.steps.push(step);
                        }
                        DispatchOutcome::RepeatDetected { key, count } => {
                            debug!(session = %session.id, key = %key, count, "Skipping repeated tool call");
                            repeated = Some(key);
                            break;
                        }
                        DispatchOutcome::Cancelled => {
                            session.conversation.append_assistant(pending);
                            return LoopState::Terminated(TerminationReason::Cancelled);
                        }
                    }
                }
                Block::ToolResult { tool_use_id, .. } => {
                    warn!(
                        session = %session.id,
                        tool_use_id = %tool_use_id,
                        "Ignoring tool_result block emitted by the provider"
                    );
                }
            }
        }

        session.conversation.append_assistant(pending);
        LoopState::CheckTermination(TurnSummary {
            stop_reason,
            tool_used,
            repeated,
        })
    }

    fn check_termination(
        &self,
        session: &Session<'_>,
        turn: TurnSummary,
        interactive: bool,
    ) -> LoopState {
        if let Some(key) = turn.repeated {
            return LoopState::Terminated(TerminationReason::RepeatedCallDetected {
                key: key.to_string(),
            });
        }

        if !turn.tool_used {
            if !turn.stop_reason.is_terminal() {
                warn!(
                    session = %session.id,
                    "Provider requested tool use without a tool_use block"
                );
            }
            return if interactive {
                LoopState::AwaitingUserInput
            } else {
                LoopState::Terminated(TerminationReason::NaturalCompletion)
            };
        }

        match session.governor.exhausted() {
            Some(kind) => LoopState::Terminated(TerminationReason::BudgetExceeded(kind)),
            None => LoopState::AwaitingCompletion,
        }
    }

    async fn await_user_input(
        &self,
        session: &mut Session<'_>,
        input: &mut dyn UserInput,
        cancel: &CancellationToken,
    ) -> LoopState {
        let end_marker = self.options.end_of_conversation.trim().to_lowercase();
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => return LoopState::Terminated(TerminationReason::Cancelled),
                message = input.next_message() => message,
            };
            let Some(message) = message else {
                debug!(session = %session.id, "User input closed");
                return LoopState::Terminated(TerminationReason::UserEnded);
            };
            let message = message.trim();
            if message.is_empty() {
                continue;
            }
            if message.to_lowercase() == end_marker {
                return LoopState::Terminated(TerminationReason::UserEnded);
            }
            session.conversation.append_user(message);
            return LoopState::AwaitingCompletion;
        }
    }
}
