use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventSource;

/// Something the agent or the user did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// A chat turn.
    Message {
        #[serde(default)]
        content: String,
        #[serde(default)]
        image_urls: Option<Vec<String>>,
        #[serde(default)]
        wait_for_response: bool,
    },
    /// A shell command.
    Run {
        command: String,
        #[serde(default)]
        thought: String,
        #[serde(default)]
        is_input: bool,
    },
    RunIpython {
        code: String,
        #[serde(default)]
        thought: String,
    },
    Edit {
        path: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        thought: String,
    },
    Read {
        path: String,
        #[serde(default)]
        thought: String,
    },
    Write {
        path: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        thought: String,
    },
    Browse {
        url: String,
        #[serde(default)]
        thought: String,
    },
    BrowseInteractive {
        browser_actions: String,
        #[serde(default)]
        thought: String,
    },
    Delegate {
        agent: String,
        #[serde(default)]
        inputs: Value,
        #[serde(default)]
        thought: String,
    },
    Think {
        #[serde(default)]
        thought: String,
    },
    Finish {
        #[serde(default)]
        thought: String,
        #[serde(default)]
        outputs: Value,
    },
    Search {
        query: String,
        #[serde(default)]
        thought: String,
    },
    Reject {
        #[serde(default)]
        reason: String,
    },
    ChangeAgentState {
        agent_state: String,
    },
    Null,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Message { .. } => "message",
            Action::Run { .. } => "run",
            Action::RunIpython { .. } => "run_ipython",
            Action::Edit { .. } => "edit",
            Action::Read { .. } => "read",
            Action::Write { .. } => "write",
            Action::Browse { .. } => "browse",
            Action::BrowseInteractive { .. } => "browse_interactive",
            Action::Delegate { .. } => "delegate",
            Action::Think { .. } => "think",
            Action::Finish { .. } => "finish",
            Action::Search { .. } => "search",
            Action::Reject { .. } => "reject",
            Action::ChangeAgentState { .. } => "change_agent_state",
            Action::Null => "null",
        }
    }

    /// Whether this action is the model invoking a tool, so its assistant
    /// turn must wait for the matching results. Shell commands only count
    /// when the agent ran them.
    pub fn is_tool_initiating(&self, source: EventSource) -> bool {
        match self {
            Action::Delegate { .. }
            | Action::Think { .. }
            | Action::RunIpython { .. }
            | Action::Edit { .. }
            | Action::Read { .. }
            | Action::BrowseInteractive { .. }
            | Action::Browse { .. }
            | Action::Search { .. } => true,
            Action::Run { .. } => source == EventSource::Agent,
            Action::Message { .. }
            | Action::Write { .. }
            | Action::Finish { .. }
            | Action::Reject { .. }
            | Action::ChangeAgentState { .. }
            | Action::Null => false,
        }
    }
}
