use serde_json::Value;

use crate::axtree::AxTreeFlattener;
use crate::correlator::Correlator;
use crate::error::ConversationError;
use crate::events::{BrowseTrigger, Event, Observation};
use crate::truncate::truncate_content;
use crate::types::{Content, Message, Role};

const INLINE_PNG: &str = "![image](data:image/png;base64,";
const INLINE_PNG_PLACEHOLDER: &str = "![image](data:image/png;base64, ...) already displayed to user";
const SCREENSHOT_NOTE: &str = "Image: Current webpage screenshot (Note that only visible portion of webpage is present in the screenshot. However, the Accessibility tree contains information from the entire webpage.)\n";

/// Knobs that shape observation text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationOptions {
    pub max_message_chars: Option<usize>,
    pub vision_is_active: bool,
    pub enable_som_visual_browsing: bool,
}

/// Render one observation. Every renderable observation yields a message;
/// tool results are handed to the correlator as tool-role messages and
/// surface once their batch completes.
pub fn render_observation(
    event: &Event,
    observation: &Observation,
    correlator: &mut Correlator,
    flattener: &dyn AxTreeFlattener,
    opts: ObservationOptions,
) -> Result<Option<Message>, ConversationError> {
    let max = opts.max_message_chars;
    let content = match observation {
        Observation::Run(cmd) => {
            let text = match event.tool_call_metadata {
                None => format!(
                    "\nObserved result of command executed by user:\n{}",
                    cmd.to_agent_observation()
                ),
                Some(_) => cmd.to_agent_observation(),
            };
            vec![Content::text(truncate_content(&text, max))]
        }
        Observation::RunIpython { content, .. } => {
            let text = strip_inline_images(content);
            vec![Content::text(truncate_content(&text, max))]
        }
        Observation::Edit(edit) => {
            vec![Content::text(truncate_content(&edit.to_agent_observation(), max))]
        }
        // Already bounded by the file reader.
        Observation::Read { content, .. } => vec![Content::text(content.as_str())],
        Observation::Browse(browse) => {
            let mut text = browse.agent_text(flattener);
            let show_screenshot = browse.trigger_by_action == BrowseTrigger::BrowseInteractive
                && !browse.set_of_marks.is_empty()
                && opts.enable_som_visual_browsing
                && opts.vision_is_active;
            if show_screenshot {
                text.push_str(SCREENSHOT_NOTE);
                vec![
                    Content::text(text),
                    Content::image(vec![browse.set_of_marks.clone()]),
                ]
            } else {
                vec![Content::text(text)]
            }
        }
        Observation::Delegate { outputs, .. } => {
            let text = match outputs.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            vec![Content::text(truncate_content(&text, max))]
        }
        Observation::Think { content } | Observation::Condense { content } => {
            vec![Content::text(truncate_content(content, max))]
        }
        Observation::Error { content } => {
            let mut text = truncate_content(content, max);
            text.push_str("\n[Error occurred in processing last action]");
            vec![Content::text(text)]
        }
        Observation::UserRejected { content } => {
            let mut text = format!("OBSERVATION:\n{}", truncate_content(content, max));
            text.push_str("\n[Last action has been rejected by the user]");
            vec![Content::text(text)]
        }
        Observation::Search { content, .. } | Observation::Download { content, .. } => {
            vec![Content::text(content.as_str())]
        }
        Observation::Null { .. }
        | Observation::Success { .. }
        | Observation::AgentStateChanged { .. } => {
            return Err(ConversationError::UnknownObservation(observation.kind()))
        }
    };

    match &event.tool_call_metadata {
        Some(metadata) => {
            correlator.register_result(
                &metadata.tool_call_id,
                Message::tool_response(
                    content,
                    metadata.tool_call_id.as_str(),
                    metadata.function_name.as_str(),
                ),
            );
            Ok(None)
        }
        None => Ok(Some(Message::new(Role::User, content))),
    }
}

/// Replace inlined base64 PNG lines; the user has already seen them and
/// they would swamp the context.
fn strip_inline_images(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.contains(INLINE_PNG) {
                INLINE_PNG_PLACEHOLDER
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
