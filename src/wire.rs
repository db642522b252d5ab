use serde_json::{json, Map, Value};

use crate::types::{Content, Message, Role};

/// Which provider features shape the serialized message.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireOptions {
    pub cache_enabled: bool,
    pub vision_enabled: bool,
    pub function_calling_enabled: bool,
}

impl Message {
    /// Serialize to the chat-completion message shape. Content is a block
    /// list when any provider feature is on, otherwise a plain joined string.
    pub fn to_chat_value(&self, opts: &WireOptions) -> Value {
        let mut out = Map::new();
        if opts.cache_enabled || opts.vision_enabled || opts.function_calling_enabled {
            let (content, tool_cache) = self.content_blocks(opts);
            out.insert("content".into(), Value::Array(content));
            if tool_cache {
                out.insert("cache_control".into(), ephemeral());
            }
        } else {
            out.insert("content".into(), Value::String(self.joined_text()));
        }
        out.insert("role".into(), Value::String(self.role.as_str().into()));

        if let Some(calls) = &self.tool_calls {
            let calls = calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": {
                            "name": c.function.name,
                            "arguments": c.function.arguments,
                        },
                    })
                })
                .collect();
            out.insert("tool_calls".into(), Value::Array(calls));
        }
        if let Some(id) = &self.tool_call_id {
            out.insert("tool_call_id".into(), Value::String(id.clone()));
            if let Some(name) = &self.name {
                out.insert("name".into(), Value::String(name.clone()));
            }
        }
        Value::Object(out)
    }

    /// Returns the block list and whether a tool message's cache mark was
    /// hoisted to the message level.
    fn content_blocks(&self, opts: &WireOptions) -> (Vec<Value>, bool) {
        let hoist = self.role == Role::Tool;
        let mut tool_cache = false;
        let mut blocks = Vec::new();

        for item in &self.content {
            let marked = item.cache_prompt();
            if hoist && marked {
                tool_cache = true;
            }
            let inline_mark = marked && !hoist;
            match item {
                Content::Text { text, .. } => {
                    let mut block = json!({"type": "text", "text": text});
                    if inline_mark {
                        block["cache_control"] = ephemeral();
                    }
                    blocks.push(block);
                }
                Content::Image { image_urls, .. } if opts.vision_enabled => {
                    let last = image_urls.len().saturating_sub(1);
                    for (idx, url) in image_urls.iter().enumerate() {
                        let mut block = json!({"type": "image_url", "image_url": {"url": url}});
                        if inline_mark && idx == last {
                            block["cache_control"] = ephemeral();
                        }
                        blocks.push(block);
                    }
                }
                Content::Image { .. } => {}
            }
        }
        (blocks, tool_cache)
    }
}

fn ephemeral() -> Value {
    json!({"type": "ephemeral"})
}
