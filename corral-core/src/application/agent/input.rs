use async_trait::async_trait;

/// Source of follow-up user turns for interactive sessions.
#[async_trait]
pub trait UserInput: Send {
    /// The next user message, or `None` once the input is closed.
    async fn next_message(&mut self) -> Option<String>;
}

/// Replays a fixed list of messages, then reports closed input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    messages: std::collections::VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UserInput for ScriptedInput {
    async fn next_message(&mut self) -> Option<String> {
        self.messages.pop_front()
    }
}

#[async_trait]
impl UserInput for tokio::sync::mpsc::Receiver<String> {
    async fn next_message(&mut self) -> Option<String> {
        self.recv().await
    }
}
