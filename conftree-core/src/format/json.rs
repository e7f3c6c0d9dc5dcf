use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::tree::Node;

/// Plain dict form of a node, recursively.
#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    line: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo_line: Option<String>,
    #[serde(default)]
    children: Vec<NodeRecord>,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            line: node.line.clone(),
            tags: node.tags.clone(),
            template: node.template.clone(),
            undo_line: node.undo_line.clone(),
            children: node.children.iter().map(NodeRecord::from).collect(),
        }
    }
}

impl NodeRecord {
    fn into_node(self, platform: Platform) -> Node {
        let mut node = Node::new(platform, self.line);
        node.tags = self.tags;
        node.template = self.template;
        node.undo_line = self.undo_line;
        for child in self.children {
            node.insert_child(child.into_node(platform));
        }
        node
    }
}

/// Serialize a tree to pretty JSON.
pub fn to_json(node: &Node) -> String {
    serde_json::to_string_pretty(&NodeRecord::from(node)).unwrap_or_else(|_| "{}".to_string())
}

/// Rebuild a tree of `platform` from its JSON dict form.
pub fn from_json(platform: Platform, raw: &str) -> Result<Node, serde_json::Error> {
    let record: NodeRecord = serde_json::from_str(raw)?;
    Ok(record.into_node(platform))
}
