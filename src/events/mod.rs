pub mod action;
pub mod browse;
pub mod observation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ToolCall;

pub use action::Action;
pub use browse::{BrowseTrigger, BrowserOutputObservation};
pub use observation::{
    CmdOutputMetadata, CmdOutputObservation, FileEditObservation, FileEditSource, Observation,
};

/// One entry in an agent's event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub source: EventSource,
    /// Present iff the event was issued by, or answers, a model tool call.
    #[serde(default)]
    pub tool_call_metadata: Option<ToolCallMetadata>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The two event families.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Action(Action),
    Observation(Observation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Agent,
    User,
    Environment,
}

/// Links an event to the model turn that requested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMetadata {
    pub function_name: String,
    pub tool_call_id: String,
    pub model_response: ModelResponse,
    #[serde(default)]
    pub total_calls_in_response: usize,
}

impl ToolCallMetadata {
    /// Groups sibling tool calls emitted in one model turn.
    pub fn response_id(&self) -> &str {
        &self.model_response.id
    }
}

/// The slice of a completion response this crate reads: the turn id and the
/// first choice's message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    #[serde(default)]
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Raw role string as returned by the provider; `None` means assistant.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Event {
    pub fn action(source: EventSource, action: Action) -> Self {
        Self {
            id: 0,
            timestamp: None,
            source,
            tool_call_metadata: None,
            kind: EventKind::Action(action),
        }
    }

    pub fn observation(source: EventSource, observation: Observation) -> Self {
        Self {
            id: 0,
            timestamp: None,
            source,
            tool_call_metadata: None,
            kind: EventKind::Observation(observation),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_tool_call_metadata(mut self, metadata: ToolCallMetadata) -> Self {
        self.tool_call_metadata = Some(metadata);
        self
    }

    /// Discriminant name, as it appears in serialized history.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            EventKind::Action(a) => a.kind(),
            EventKind::Observation(o) => o.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_action_event() {
        let raw = json!({
            "id": 3,
            "timestamp": "2024-05-01T12:00:00Z",
            "source": "agent",
            "tool_call_metadata": {
                "function_name": "execute_bash",
                "tool_call_id": "call_1",
                "model_response": {
                    "id": "resp_1",
                    "message": {
                        "content": "listing",
                        "tool_calls": [
                            {"id": "call_1", "function": {"name": "execute_bash", "arguments": "{}"}}
                        ]
                    }
                }
            },
            "action": {"action": "run", "command": "ls"}
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.id, 3);
        assert!(event.timestamp.is_some());
        assert_eq!(event.kind_name(), "run");
        let meta = event.tool_call_metadata.unwrap();
        assert_eq!(meta.response_id(), "resp_1");
        assert_eq!(meta.model_response.message.tool_calls.unwrap().len(), 1);
    }

    #[test]
    fn deserializes_observation_event_without_metadata() {
        let raw = json!({
            "source": "environment",
            "observation": {"observation": "error", "content": "boom"}
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert!(event.tool_call_metadata.is_none());
        assert!(matches!(event.kind, EventKind::Observation(Observation::Error { .. })));
    }
}
