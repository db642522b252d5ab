use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::AxTreeError;

/// Turns a structured accessibility tree into the indented text the agent
/// reads. Implement this to plug in a different page-state summarizer.
pub trait AxTreeFlattener: Send + Sync {
    fn flatten(
        &self,
        axtree: &Value,
        extra_properties: &Value,
        filter_visible_only: bool,
    ) -> Result<String, AxTreeError>;
}

/// Flattens a node-list tree of the shape
/// `{"nodes": [{"nodeId", "role", "name", "childIds", "properties", "browsergym_id"}]}`
/// starting from the first node.
#[derive(Debug, Clone, Default)]
pub struct DefaultAxTreeFlattener;

/// Nodes below this visibility ratio are hidden in visible-only mode.
const MIN_VISIBILITY: f64 = 0.5;

/// Deepest nesting the flattener will follow. Indentation grows with depth,
/// so this also bounds the width of each rendered line.
pub const MAX_DEPTH: usize = 256;

impl AxTreeFlattener for DefaultAxTreeFlattener {
    fn flatten(
        &self,
        axtree: &Value,
        extra_properties: &Value,
        filter_visible_only: bool,
    ) -> Result<String, AxTreeError> {
        let nodes = axtree["nodes"]
            .as_array()
            .filter(|n| !n.is_empty())
            .ok_or(AxTreeError::Empty)?;

        let mut by_id: HashMap<&str, &Value> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node["nodeId"]
                .as_str()
                .ok_or_else(|| AxTreeError::MalformedNode(node.to_string()))?;
            by_id.insert(id, node);
        }

        let walker = Walker {
            by_id,
            extra: extra_properties,
            filter_visible_only,
        };
        walker.walk(&nodes[0])
    }
}

struct Walker<'a> {
    by_id: HashMap<&'a str, &'a Value>,
    extra: &'a Value,
    filter_visible_only: bool,
}

impl<'a> Walker<'a> {
    /// Pre-order walk over an explicit stack. Each entry carries the node,
    /// its indentation and its nesting level in the raw tree.
    fn walk(&self, root: &'a Value) -> Result<String, AxTreeError> {
        let mut lines = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(root, 0usize, 0usize)];

        while let Some((node, indent, level)) = stack.pop() {
            if level > MAX_DEPTH {
                return Err(AxTreeError::TooDeep(MAX_DEPTH));
            }
            let id = node["nodeId"].as_str().unwrap_or_default();
            if !seen.insert(id) {
                return Err(AxTreeError::MalformedNode(format!("node {id} visited twice")));
            }

            let role = scalar(&node["role"]);
            let bid = node["browsergym_id"].as_str();
            let extra = bid.map(|b| &self.extra[b]).unwrap_or(&Value::Null);

            let hidden = node["ignored"].as_bool().unwrap_or(false)
                || matches!(role.as_str(), "" | "none" | "Ignored")
                || (self.filter_visible_only
                    && extra["visibility"].as_f64().is_some_and(|v| v < MIN_VISIBILITY));

            let child_indent = if hidden {
                indent
            } else {
                lines.push(self.render(node, &role, bid, extra, indent));
                indent + 1
            };

            let Some(children) = node["childIds"].as_array() else {
                continue;
            };
            for child in children.iter().rev() {
                let child_id = child
                    .as_str()
                    .ok_or_else(|| AxTreeError::MalformedNode(child.to_string()))?;
                let child_node = self
                    .by_id
                    .get(child_id)
                    .copied()
                    .ok_or_else(|| AxTreeError::DanglingChild(child_id.to_string()))?;
                stack.push((child_node, child_indent, level + 1));
            }
        }
        Ok(lines.join("\n"))
    }

    fn render(
        &self,
        node: &Value,
        role: &str,
        bid: Option<&str>,
        extra: &Value,
        depth: usize,
    ) -> String {
        let mut line = "\t".repeat(depth);
        if let Some(bid) = bid {
            line.push_str(&format!("[{bid}] "));
        }
        line.push_str(role);
        let name = scalar(&node["name"]);
        if !name.is_empty() {
            line.push_str(&format!(" '{name}'"));
        }
        if let Some(props) = node["properties"].as_array() {
            for prop in props {
                let key = prop["name"].as_str().unwrap_or_default();
                let value = scalar(&prop["value"]);
                if !key.is_empty() && !value.is_empty() {
                    line.push_str(&format!(", {key}={value}"));
                }
            }
        }
        if extra["clickable"].as_bool().unwrap_or(false) {
            line.push_str(", clickable");
        }
        line
    }
}

/// Reads either a bare scalar or the CDP `{"value": ...}` wrapper.
fn scalar(value: &Value) -> String {
    let inner = match value {
        Value::Object(map) => map.get("value").unwrap_or(&Value::Null),
        other => other,
    };
    match inner {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
