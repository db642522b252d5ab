use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::browse::BrowserOutputObservation;

/// Something that resulted from an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "observation", rename_all = "snake_case")]
pub enum Observation {
    Run(CmdOutputObservation),
    RunIpython {
        content: String,
        #[serde(default)]
        code: String,
    },
    Edit(FileEditObservation),
    Read {
        content: String,
        path: String,
    },
    Browse(BrowserOutputObservation),
    Delegate {
        #[serde(default)]
        content: String,
        #[serde(default)]
        outputs: Map<String, Value>,
    },
    Think {
        content: String,
    },
    Error {
        content: String,
    },
    UserRejected {
        content: String,
    },
    Condense {
        content: String,
    },
    Search {
        content: String,
        #[serde(default)]
        query: String,
    },
    Download {
        content: String,
        #[serde(default)]
        file_path: String,
    },
    Null {
        #[serde(default)]
        content: String,
    },
    Success {
        #[serde(default)]
        content: String,
    },
    AgentStateChanged {
        agent_state: String,
    },
}

impl Observation {
    pub fn kind(&self) -> &'static str {
        match self {
            Observation::Run(_) => "run",
            Observation::RunIpython { .. } => "run_ipython",
            Observation::Edit(_) => "edit",
            Observation::Read { .. } => "read",
            Observation::Browse(_) => "browse",
            Observation::Delegate { .. } => "delegate",
            Observation::Think { .. } => "think",
            Observation::Error { .. } => "error",
            Observation::UserRejected { .. } => "user_rejected",
            Observation::Condense { .. } => "condense",
            Observation::Search { .. } => "search",
            Observation::Download { .. } => "download",
            Observation::Null { .. } => "null",
            Observation::Success { .. } => "success",
            Observation::AgentStateChanged { .. } => "agent_state_changed",
        }
    }
}

/// Output of a shell command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmdOutputObservation {
    pub content: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub metadata: CmdOutputMetadata,
}

/// Shell state captured alongside a command's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmdOutputMetadata {
    /// -1 while the command is still running or was interrupted.
    pub exit_code: i32,
    pub pid: i32,
    pub username: Option<String>,
    pub hostname: Option<String>,
    pub working_dir: Option<String>,
    pub py_interpreter_path: Option<String>,
    pub prefix: String,
    pub suffix: String,
}

impl Default for CmdOutputMetadata {
    fn default() -> Self {
        Self {
            exit_code: -1,
            pid: -1,
            username: None,
            hostname: None,
            working_dir: None,
            py_interpreter_path: None,
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

impl CmdOutputObservation {
    /// The report the agent sees: output framed by shell context.
    pub fn to_agent_observation(&self) -> String {
        let meta = &self.metadata;
        let mut report = format!("{}{}{}", meta.prefix, self.content, meta.suffix);
        if let Some(dir) = meta.working_dir.as_deref().filter(|d| !d.is_empty()) {
            report.push_str(&format!("\n[Current working directory: {dir}]"));
        }
        if let Some(py) = meta.py_interpreter_path.as_deref().filter(|p| !p.is_empty()) {
            report.push_str(&format!("\n[Python interpreter: {py}]"));
        }
        if meta.exit_code != -1 {
            report.push_str(&format!(
                "\n[Command finished with exit code {}]",
                meta.exit_code
            ));
        }
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEditSource {
    /// Edit performed by the ACI editor, whose output is already agent-ready.
    #[default]
    OhAci,
    LlmBasedEdit,
}

/// Result of a file edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEditObservation {
    #[serde(default)]
    pub content: String,
    pub path: String,
    #[serde(default)]
    pub prev_exist: bool,
    #[serde(default)]
    pub impl_source: FileEditSource,
    /// Unified diff of the change, when the editor produced one.
    #[serde(default)]
    pub diff: Option<String>,
}

impl FileEditObservation {
    pub fn to_agent_observation(&self) -> String {
        match self.impl_source {
            FileEditSource::OhAci => self.content.clone(),
            FileEditSource::LlmBasedEdit if !self.prev_exist => format!(
                "[New file {} is created with the provided content.]\n",
                self.path
            ),
            FileEditSource::LlmBasedEdit => format!(
                "[Existing file {} is edited with the following changes:]\n{}",
                self.path,
                self.diff.as_deref().unwrap_or(&self.content)
            ),
        }
    }
}
