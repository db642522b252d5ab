/// Supplies the system prompt text that seeds every conversation.
pub trait SystemPrompt: Send + Sync {
    fn system_message(&self) -> String;
}

/// A fixed system prompt.
#[derive(Debug, Clone)]
pub struct StaticSystemPrompt(pub String);

impl StaticSystemPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl SystemPrompt for StaticSystemPrompt {
    fn system_message(&self) -> String {
        self.0.clone()
    }
}
