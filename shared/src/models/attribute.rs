//! Attribute Model

use serde::{Deserialize, Serialize};

/// Variation attribute node (one row of the attribute forest)
///
/// Rows are stored flat; the tree is rebuilt from `parent_id` references.
/// A node without parent is a root, a node without children is a leaf and
/// only leaves own option values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNode {
    pub id: String,
    pub name: String,
    /// Parent attribute reference (None = root)
    pub parent_id: Option<String>,
    /// 0 for roots, parent depth + 1 otherwise
    pub depth: u32,
    /// Ordering among siblings
    #[serde(default)]
    pub display_order: i32,
}

impl AttributeNode {
    /// Create a root attribute
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            depth: 0,
            display_order: 0,
        }
    }

    /// Create a child attribute under `parent`
    pub fn child(id: impl Into<String>, name: impl Into<String>, parent: &AttributeNode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: Some(parent.id.clone()),
            depth: parent.depth + 1,
            display_order: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_depth_follows_parent() {
        let paper = AttributeNode::root("paper", "Paper Type");
        let weight = AttributeNode::child("weight", "Weight", &paper);

        assert!(paper.is_root());
        assert!(!weight.is_root());
        assert_eq!(weight.depth, 1);
        assert_eq!(weight.parent_id.as_deref(), Some("paper"));
    }

    #[test]
    fn test_display_order_defaults() {
        let node: AttributeNode =
            serde_json::from_str(r#"{"id":"a","name":"Color","parent_id":null,"depth":0}"#)
                .unwrap();
        assert_eq!(node.display_order, 0);
    }
}
