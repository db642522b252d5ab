#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("tool call metadata missing on tool-initiating action `{kind}` (event {event_id})")]
    MissingToolMetadata { kind: &'static str, event_id: i64 },
    #[error("pending message for response `{response_id}` has no tool_calls")]
    MissingToolCalls { response_id: String },
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("unknown observation type: {0}")]
    UnknownObservation(&'static str),
}

/// Failure while flattening a browser accessibility tree. Never fatal: the
/// browser renderer folds it into the observation text.
#[derive(Debug, thiserror::Error)]
pub enum AxTreeError {
    #[error("accessibility tree has no nodes")]
    Empty,
    #[error("malformed node: {0}")]
    MalformedNode(String),
    #[error("node `{0}` referenced but not present")]
    DanglingChild(String),
    #[error("tree nested deeper than {0} levels")]
    TooDeep(usize),
}
