use std::collections::HashMap;

use tracing::debug;

use crate::error::ConversationError;
use crate::types::Message;

/// An assistant turn that asked for tools, waiting on their results.
#[derive(Debug, Clone)]
struct PendingBatch {
    response_id: String,
    message: Message,
}

/// Pairs tool-initiating assistant messages with their tool results.
///
/// Results may arrive before or after the turn that requested them. A batch
/// is released only once every `tool_calls` entry has a result, and then as
/// the assistant message followed by its results in declaration order.
#[derive(Debug, Default)]
pub struct Correlator {
    /// Insertion-ordered; an overwrite keeps the original slot.
    pending: Vec<PendingBatch>,
    resolved: HashMap<String, Message>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the initiating message for `response_id`. A later message for
    /// the same response replaces the earlier one.
    pub fn register_pending(&mut self, response_id: &str, message: Message) {
        if let Some(batch) = self
            .pending
            .iter_mut()
            .find(|b| b.response_id == response_id)
        {
            debug!(response_id, "replacing pending tool call message");
            batch.message = message;
            return;
        }
        debug!(
            response_id,
            tool_calls = message.tool_calls.as_ref().map_or(0, Vec::len),
            "tool call batch pending"
        );
        self.pending.push(PendingBatch {
            response_id: response_id.to_string(),
            message,
        });
    }

    /// Buffer a rendered tool-role message until its batch completes.
    pub fn register_result(&mut self, tool_call_id: &str, message: Message) {
        debug!(tool_call_id, "tool result buffered");
        self.resolved.insert(tool_call_id.to_string(), message);
    }

    /// Release every batch whose results are all present.
    pub fn drain_ready(&mut self) -> Result<Vec<Message>, ConversationError> {
        let mut ready = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for batch in std::mem::take(&mut self.pending) {
            let Some(tool_calls) = batch.message.tool_calls.as_ref() else {
                return Err(ConversationError::MissingToolCalls {
                    response_id: batch.response_id,
                });
            };
            if !tool_calls.iter().all(|c| self.resolved.contains_key(&c.id)) {
                still_pending.push(batch);
                continue;
            }

            let results: Vec<Message> = tool_calls
                .iter()
                .filter_map(|c| self.resolved.remove(&c.id))
                .collect();
            debug!(
                response_id = %batch.response_id,
                results = results.len(),
                "tool call batch complete"
            );
            ready.push(batch.message);
            ready.extend(results);
        }

        self.pending = still_pending;
        Ok(ready)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn buffered_len(&self) -> usize {
        self.resolved.len()
    }
}
