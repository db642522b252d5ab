use tracing::debug;

use crate::types::{Message, Role};

/// Place the prompt-caching breakpoint on the last block of the most recent
/// user or tool message. Marks left on earlier user/tool messages are
/// cleared so only one such breakpoint exists; system messages keep theirs.
pub fn apply_prompt_caching(messages: &mut [Message]) {
    let Some(target) = messages
        .iter()
        .rposition(|m| matches!(m.role, Role::User | Role::Tool) && !m.content.is_empty())
    else {
        return;
    };

    for (idx, message) in messages.iter_mut().enumerate() {
        if !matches!(message.role, Role::User | Role::Tool) {
            continue;
        }
        let last = message.content.len().saturating_sub(1);
        for (block_idx, block) in message.content.iter_mut().enumerate() {
            block.set_cache_prompt(idx == target && block_idx == last);
        }
    }
    debug!(index = target, "prompt cache breakpoint placed");
}
