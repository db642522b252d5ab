pub mod axtree;
pub mod cache;
pub mod correlator;
pub mod error;
pub mod events;
pub mod prompt;
pub mod render;
pub mod truncate;
pub mod types;
pub mod wire;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use axtree::{AxTreeFlattener, DefaultAxTreeFlattener};
pub use cache::apply_prompt_caching;
pub use correlator::Correlator;
pub use error::{AxTreeError, ConversationError};
pub use events::{
    Action, BrowseTrigger, BrowserOutputObservation, CmdOutputMetadata, CmdOutputObservation,
    Event, EventKind, EventSource, FileEditObservation, FileEditSource, ModelResponse,
    Observation, ResponseMessage, ToolCallMetadata,
};
pub use prompt::{StaticSystemPrompt, SystemPrompt};
pub use render::ObservationOptions;
pub use truncate::{truncate_content, TRUNCATION_MARKER};
pub use types::{Content, FunctionCall, Message, Role, ToolCall};
pub use wire::WireOptions;

/// How events are shaped into messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Observation text longer than this is cut in the middle. `None` keeps
    /// everything.
    pub max_message_chars: Option<usize>,
    /// Include image content for vision-capable models.
    pub vision_is_active: bool,
    /// Attach set-of-marks screenshots to interactive browsing results.
    pub enable_som_visual_browsing: bool,
}

impl ConversationConfig {
    pub fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = Some(max);
        self
    }

    pub fn with_vision(mut self, active: bool) -> Self {
        self.vision_is_active = active;
        self
    }

    pub fn with_som_visual_browsing(mut self, enabled: bool) -> Self {
        self.enable_som_visual_browsing = enabled;
        self
    }

    fn observation_options(&self) -> ObservationOptions {
        ObservationOptions {
            max_message_chars: self.max_message_chars,
            vision_is_active: self.vision_is_active,
            enable_som_visual_browsing: self.enable_som_visual_browsing,
        }
    }
}

/// Turns an agent's event history into the message list sent to the model.
pub struct ConversationMemory {
    prompt: Box<dyn SystemPrompt>,
    flattener: Box<dyn AxTreeFlattener>,
}

impl ConversationMemory {
    pub fn new(prompt: impl SystemPrompt + 'static) -> Self {
        Self {
            prompt: Box::new(prompt),
            flattener: Box::new(DefaultAxTreeFlattener),
        }
    }

    pub fn with_axtree_flattener(mut self, flattener: impl AxTreeFlattener + 'static) -> Self {
        self.flattener = Box::new(flattener);
        self
    }

    /// The system message that opens every conversation.
    pub fn process_initial_messages(&self, with_caching: bool) -> Vec<Message> {
        vec![Message::new(
            Role::System,
            vec![Content::Text {
                text: self.prompt.system_message(),
                cache_prompt: with_caching,
            }],
        )]
    }

    /// Translate `history` into messages, appended after `initial_messages`.
    ///
    /// Tool-initiating actions and their results are held back until the
    /// whole batch has arrived, then emitted together: the assistant turn
    /// first, its results after it in the order the model declared them.
    /// Batches still incomplete at the end of the history are left out.
    pub fn process_events(
        &self,
        history: &[Event],
        initial_messages: Vec<Message>,
        config: &ConversationConfig,
    ) -> Result<Vec<Message>, ConversationError> {
        let mut messages = initial_messages;
        let mut correlator = Correlator::new();
        let obs_opts = config.observation_options();

        for event in history {
            let rendered = match &event.kind {
                EventKind::Action(action) => render::render_action(
                    event,
                    action,
                    &mut correlator,
                    config.vision_is_active,
                )?,
                EventKind::Observation(observation) => render::render_observation(
                    event,
                    observation,
                    &mut correlator,
                    self.flattener.as_ref(),
                    obs_opts,
                )?,
            };
            messages.extend(rendered);
            messages.extend(correlator.drain_ready()?);
        }

        if correlator.pending_len() > 0 || correlator.buffered_len() > 0 {
            debug!(
                pending = correlator.pending_len(),
                buffered = correlator.buffered_len(),
                "unresolved tool calls left out of conversation"
            );
        }
        Ok(messages)
    }

    /// See [`apply_prompt_caching`].
    pub fn apply_prompt_caching(&self, messages: &mut [Message]) {
        cache::apply_prompt_caching(messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    // --- Helpers ---

    fn memory() -> ConversationMemory {
        ConversationMemory::new(StaticSystemPrompt::new("S"))
    }

    fn seed() -> Vec<Message> {
        vec![Message::system("S")]
    }

    fn metadata(response_id: &str, call_id: &str, name: &str, calls: &[&str]) -> ToolCallMetadata {
        ToolCallMetadata {
            function_name: name.into(),
            tool_call_id: call_id.into(),
            model_response: ModelResponse {
                id: response_id.into(),
                message: ResponseMessage {
                    role: Some("assistant".into()),
                    content: Some(format!("calling {name}")),
                    tool_calls: Some(calls.iter().map(|c| ToolCall::new(*c, name, "{}")).collect()),
                },
            },
            total_calls_in_response: calls.len(),
        }
    }

    fn result_metadata(call_id: &str, name: &str) -> ToolCallMetadata {
        ToolCallMetadata {
            function_name: name.into(),
            tool_call_id: call_id.into(),
            model_response: ModelResponse::default(),
            total_calls_in_response: 1,
        }
    }

    fn user_says(text: &str) -> Event {
        Event::action(
            EventSource::User,
            Action::Message {
                content: text.into(),
                image_urls: None,
                wait_for_response: false,
            },
        )
    }

    fn agent_runs(command: &str, meta: ToolCallMetadata) -> Event {
        Event::action(
            EventSource::Agent,
            Action::Run {
                command: command.into(),
                thought: String::new(),
                is_input: false,
            },
        )
        .with_tool_call_metadata(meta)
    }

    fn command_output(text: &str, meta: ToolCallMetadata) -> Event {
        Event::observation(
            EventSource::Environment,
            Observation::Run(CmdOutputObservation {
                content: text.into(),
                command: String::new(),
                metadata: CmdOutputMetadata::default(),
            }),
        )
        .with_tool_call_metadata(meta)
    }

    fn summary(messages: &[Message]) -> Vec<(Role, String, Option<String>)> {
        messages
            .iter()
            .map(|m| (m.role, m.joined_text(), m.tool_call_id.clone()))
            .collect()
    }

    // --- Tests ---

    #[test]
    fn delegate_round_trip_end_to_end() {
        let mut outputs = serde_json::Map::new();
        outputs.insert("content".into(), json!("done"));
        let history = vec![
            user_says("hi"),
            Event::action(
                EventSource::Agent,
                Action::Delegate {
                    agent: "BrowsingAgent".into(),
                    inputs: Value::Null,
                    thought: String::new(),
                },
            )
            .with_tool_call_metadata(ToolCallMetadata {
                model_response: ModelResponse {
                    id: "r1".into(),
                    message: ResponseMessage {
                        role: None,
                        content: Some("calling delegate".into()),
                        tool_calls: Some(vec![ToolCall::new("t1", "delegate", "{}")]),
                    },
                },
                ..result_metadata("t1", "delegate")
            }),
            Event::observation(
                EventSource::Agent,
                Observation::Delegate {
                    content: String::new(),
                    outputs,
                },
            )
            .with_tool_call_metadata(result_metadata("t1", "delegate")),
        ];

        let out = memory()
            .process_events(&history, seed(), &ConversationConfig::default())
            .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], Message::system("S"));
        assert_eq!(out[1], Message::user("hi"));
        assert_eq!(
            out[2],
            Message::assistant("calling delegate")
                .with_tool_calls(vec![ToolCall::new("t1", "delegate", "{}")])
        );
        assert_eq!(
            out[3],
            Message::tool_response(vec![Content::text("done")], "t1", "delegate")
        );
    }

    #[test]
    fn parallel_calls_emit_in_declaration_order() {
        let calls = ["t1", "t2"];
        let history = vec![
            agent_runs("ls", metadata("r1", "t1", "execute_bash", &calls)),
            agent_runs("pwd", metadata("r1", "t2", "execute_bash", &calls)),
            command_output("second", result_metadata("t2", "execute_bash")),
            user_says("interleaved"),
            command_output("first", result_metadata("t1", "execute_bash")),
        ];
        let out = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap();
        let s = summary(&out);
        assert_eq!(s.len(), 4, "got: {s:?}");
        assert_eq!(s[0], (Role::User, "interleaved".into(), None));
        assert_eq!(s[1].0, Role::Assistant);
        assert_eq!(s[2], (Role::Tool, "first".into(), Some("t1".into())));
        assert_eq!(s[3], (Role::Tool, "second".into(), Some("t2".into())));
    }

    #[test]
    fn result_arriving_first_is_paired_when_action_lands() {
        let history = vec![
            command_output("early", result_metadata("t1", "execute_bash")),
            agent_runs("ls", metadata("r1", "t1", "execute_bash", &["t1"])),
        ];
        let out = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, Role::Assistant);
        assert_eq!(out[1].tool_call_id.as_deref(), Some("t1"));
    }

    #[test]
    fn dangling_batch_emits_nothing() {
        let calls = ["t1", "t2"];
        let history = vec![
            user_says("go"),
            agent_runs("ls", metadata("r1", "t1", "execute_bash", &calls)),
            command_output("one", result_metadata("t1", "execute_bash")),
        ];
        let out = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap();
        assert_eq!(summary(&out), vec![(Role::User, "go".into(), None)]);
    }

    #[test]
    fn dropped_variants_do_not_disturb_order() {
        let history = vec![
            user_says("a"),
            Event::action(EventSource::Agent, Action::Null),
            Event::action(
                EventSource::Agent,
                Action::ChangeAgentState {
                    agent_state: "awaiting_user_input".into(),
                },
            ),
            user_says("b"),
        ];
        let out = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap();
        let texts: Vec<_> = out.iter().map(Message::joined_text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn unknown_observation_aborts() {
        let history = vec![Event::observation(
            EventSource::Environment,
            Observation::Null {
                content: String::new(),
            },
        )];
        let err = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConversationError::UnknownObservation("null")));
    }

    #[test]
    fn tool_initiating_action_without_metadata_aborts() {
        let history = vec![Event::action(
            EventSource::Agent,
            Action::Read {
                path: "/etc/hosts".into(),
                thought: String::new(),
            },
        )];
        let err = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConversationError::MissingToolMetadata { kind: "read", .. }
        ));
    }

    #[test]
    fn vision_config_reaches_message_rendering() {
        let history = vec![Event::action(
            EventSource::User,
            Action::Message {
                content: "look".into(),
                image_urls: Some(vec!["u1".into(), "u2".into()]),
                wait_for_response: false,
            },
        )];
        let config = ConversationConfig::default().with_vision(true);
        let out = memory().process_events(&history, vec![], &config).unwrap();
        assert_eq!(
            out[0].content,
            vec![
                Content::text("look"),
                Content::text("Image 1:"),
                Content::image(vec!["u1".into()]),
                Content::text("Image 2:"),
                Content::image(vec!["u2".into()]),
            ]
        );
    }

    #[test]
    fn truncation_budget_applies_to_observations() {
        let history = vec![Event::observation(
            EventSource::Environment,
            Observation::Think {
                content: "t".repeat(1_000),
            },
        )];
        let config = ConversationConfig::default().with_max_message_chars(120);
        let out = memory().process_events(&history, vec![], &config).unwrap();
        assert_eq!(out[0].joined_text().chars().count(), 120);
    }

    #[test]
    fn initial_messages_carry_prompt_and_cache_flag() {
        let initial = memory().process_initial_messages(true);
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].role, Role::System);
        assert_eq!(initial[0].joined_text(), "S");
        assert!(initial[0].content[0].cache_prompt());
    }

    #[test]
    fn caching_marks_single_boundary_after_processing() {
        let history = vec![
            user_says("hi"),
            agent_runs("ls", metadata("r1", "t1", "execute_bash", &["t1"])),
            command_output("a.txt", result_metadata("t1", "execute_bash")),
        ];
        let mem = memory();
        let mut out = mem
            .process_events(
                &history,
                mem.process_initial_messages(false),
                &ConversationConfig::default(),
            )
            .unwrap();
        mem.apply_prompt_caching(&mut out);
        let marked: Vec<_> = out
            .iter()
            .enumerate()
            .flat_map(|(i, m)| m.content.iter().filter(|c| c.cache_prompt()).map(move |_| i))
            .collect();
        assert_eq!(marked, vec![3]);
        assert_eq!(out[3].role, Role::Tool);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ConversationConfig =
            serde_json::from_value(json!({"max_message_chars": 30000})).unwrap();
        assert_eq!(config.max_message_chars, Some(30_000));
        assert!(!config.vision_is_active);
        assert!(!config.enable_som_visual_browsing);
    }

    #[test]
    fn history_replays_from_json() {
        let history: Vec<Event> = serde_json::from_value(json!([
            {"id": 1, "source": "user", "action": {"action": "message", "content": "list files"}},
            {"id": 2, "source": "agent",
             "tool_call_metadata": {"function_name": "execute_bash", "tool_call_id": "c1",
                "model_response": {"id": "resp", "message": {"content": "ok",
                    "tool_calls": [{"id": "c1", "function": {"name": "execute_bash",
                        "arguments": "{\"command\":\"ls\"}"}}]}}},
             "action": {"action": "run", "command": "ls"}},
            {"id": 3, "source": "agent",
             "tool_call_metadata": {"function_name": "execute_bash", "tool_call_id": "c1",
                "model_response": {"id": "resp"}},
             "observation": {"observation": "run", "content": "README.md", "command": "ls",
                "metadata": {"exit_code": 0}}}
        ]))
        .unwrap();
        let out = memory()
            .process_events(&history, vec![], &ConversationConfig::default())
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            out[2].joined_text(),
            "README.md\n[Command finished with exit code 0]"
        );
    }
}
