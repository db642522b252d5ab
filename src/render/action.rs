use std::str::FromStr;

use crate::correlator::Correlator;
use crate::error::ConversationError;
use crate::events::{Action, Event, EventSource, ToolCallMetadata};
use crate::types::{Content, Message, Role};

/// Render one action. Tool-initiating actions are parked in the correlator
/// and yield nothing until their results arrive; actions with no
/// conversational meaning are dropped.
pub fn render_action(
    event: &Event,
    action: &Action,
    correlator: &mut Correlator,
    vision_is_active: bool,
) -> Result<Option<Message>, ConversationError> {
    if action.is_tool_initiating(event.source) {
        let metadata = event.tool_call_metadata.as_ref().ok_or(
            ConversationError::MissingToolMetadata {
                kind: action.kind(),
                event_id: event.id,
            },
        )?;
        let message = initiating_message(metadata)?;
        correlator.register_pending(metadata.response_id(), message);
        return Ok(None);
    }

    let message = match action {
        Action::Finish { thought, .. } => {
            let thought = match &event.tool_call_metadata {
                Some(metadata) => fold_thought(
                    thought,
                    metadata.model_response.message.content.as_deref().unwrap_or(""),
                ),
                None => thought.clone(),
            };
            Message::text(role_for(event.source), thought)
        }
        Action::Message {
            content,
            image_urls,
            ..
        } => {
            let role = role_for(event.source);
            let mut blocks = vec![Content::text(content.as_str())];
            match image_urls {
                Some(urls) if vision_is_active && !urls.is_empty() => {
                    if role == Role::User {
                        for (idx, url) in urls.iter().enumerate() {
                            blocks.push(Content::text(format!("Image {}:", idx + 1)));
                            blocks.push(Content::image(vec![url.clone()]));
                        }
                    } else {
                        blocks.push(Content::image(urls.clone()));
                    }
                }
                _ => {}
            }
            Message::new(role, blocks)
        }
        Action::Run { command, .. } if event.source == EventSource::User => {
            Message::user(format!("User executed the command:\n{command}"))
        }
        Action::Run { .. }
        | Action::RunIpython { .. }
        | Action::Edit { .. }
        | Action::Read { .. }
        | Action::Write { .. }
        | Action::Browse { .. }
        | Action::BrowseInteractive { .. }
        | Action::Delegate { .. }
        | Action::Think { .. }
        | Action::Search { .. }
        | Action::Reject { .. }
        | Action::ChangeAgentState { .. }
        | Action::Null => return Ok(None),
    };
    Ok(Some(message))
}

/// The assistant turn that issued the tool call, as recorded in the
/// completion response.
fn initiating_message(metadata: &ToolCallMetadata) -> Result<Message, ConversationError> {
    let turn = &metadata.model_response.message;
    let role = match turn.role.as_deref() {
        Some(raw) => Role::from_str(raw)?,
        None => Role::Assistant,
    };
    let content = match &turn.content {
        Some(text) => vec![Content::text(text.as_str())],
        None => vec![],
    };
    Ok(Message {
        role,
        content,
        tool_calls: turn.tool_calls.clone(),
        tool_call_id: None,
        name: None,
    })
}

/// A finish issued as a tool call carries the model's closing text in its
/// completion; merge it into the thought.
fn fold_thought(thought: &str, response_text: &str) -> String {
    match (thought.is_empty(), response_text.is_empty()) {
        (true, _) => response_text.to_string(),
        (false, true) => thought.to_string(),
        (false, false) if thought == response_text => thought.to_string(),
        (false, false) => format!("{thought}\n{response_text}"),
    }
}

fn role_for(source: EventSource) -> Role {
    match source {
        EventSource::User => Role::User,
        EventSource::Agent | EventSource::Environment => Role::Assistant,
    }
}
