//! Attribute forest arena
//!
//! Nodes live in a flat arena indexed by id. Parent links, child lists,
//! the owning root and the root-to-node name path are resolved once at
//! build time, so lookups never re-walk the tree.

use super::TreeError;
use shared::models::AttributeNode;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
struct Entry {
    node: AttributeNode,
    parent: Option<usize>,
    children: Vec<usize>,
    root: usize,
    path: Vec<String>,
}

/// Validated attribute forest
#[derive(Debug, Clone, Default)]
pub struct AttributeForest {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl AttributeForest {
    /// Build the arena from flat attribute rows
    ///
    /// Fails on duplicate ids, dangling parent references, depth values that
    /// disagree with the parent chain, and cycles.
    pub fn build(nodes: &[AttributeNode]) -> Result<Self, TreeError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(TreeError::DuplicateAttribute(node.id.clone()));
            }
        }

        let mut parents = Vec::with_capacity(nodes.len());
        for node in nodes {
            let parent = match &node.parent_id {
                None => None,
                Some(parent_id) => {
                    let p = index.get(parent_id).copied().ok_or_else(|| {
                        TreeError::ParentNotFound {
                            id: node.id.clone(),
                            parent_id: parent_id.clone(),
                        }
                    })?;
                    Some(p)
                }
            };
            parents.push(parent);
        }

        let mut children = vec![Vec::new(); nodes.len()];
        for (i, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(i);
            }
        }
        // Stable sort: equal display_order keeps input order
        for list in &mut children {
            list.sort_by_key(|&i| nodes[i].display_order);
        }

        let mut roots: Vec<usize> = (0..nodes.len()).filter(|&i| parents[i].is_none()).collect();
        roots.sort_by_key(|&i| nodes[i].display_order);

        // Breadth-first from the roots. Each node has a single parent, so a
        // node is reached at most once; anything left unreached hangs off a cycle.
        let mut root_of: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut paths: Vec<Vec<String>> = vec![Vec::new(); nodes.len()];
        let mut queue = VecDeque::new();

        for &r in &roots {
            check_depth(&nodes[r], 0)?;
            root_of[r] = Some(r);
            paths[r] = vec![nodes[r].name.clone()];
            queue.push_back(r);
        }

        while let Some(i) = queue.pop_front() {
            for &c in &children[i] {
                check_depth(&nodes[c], nodes[i].depth + 1)?;
                root_of[c] = root_of[i];
                let mut path = paths[i].clone();
                path.push(nodes[c].name.clone());
                paths[c] = path;
                queue.push_back(c);
            }
        }

        let mut entries = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let Some(root) = root_of[i] else {
                return Err(TreeError::Cycle(node.id.clone()));
            };
            entries.push(Entry {
                node: node.clone(),
                parent: parents[i],
                children: std::mem::take(&mut children[i]),
                root,
                path: std::mem::take(&mut paths[i]),
            });
        }

        Ok(Self {
            entries,
            index,
            roots,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&AttributeNode> {
        self.entry(id).map(|e| &e.node)
    }

    pub fn parent(&self, id: &str) -> Option<&AttributeNode> {
        let entry = self.entry(id)?;
        entry.parent.map(|p| &self.entries[p].node)
    }

    /// Children in display order
    pub fn children(&self, id: &str) -> Vec<&AttributeNode> {
        self.entry(id)
            .map(|e| e.children.iter().map(|&c| &self.entries[c].node).collect())
            .unwrap_or_default()
    }

    /// Unknown ids are not leaves
    pub fn is_leaf(&self, id: &str) -> bool {
        self.entry(id).is_some_and(|e| e.children.is_empty())
    }

    pub fn root_of(&self, id: &str) -> Option<&AttributeNode> {
        self.entry(id).map(|e| &self.entries[e.root].node)
    }

    /// Attribute names from the root down to `id`
    pub fn path_of(&self, id: &str) -> Option<&[String]> {
        self.entry(id).map(|e| e.path.as_slice())
    }

    pub fn path_string(&self, id: &str, separator: &str) -> Option<String> {
        self.path_of(id).map(|p| p.join(separator))
    }

    pub fn roots(&self) -> impl Iterator<Item = &AttributeNode> {
        self.roots.iter().map(|&r| &self.entries[r].node)
    }

    /// All leaves, depth-first in display order
    pub fn leaves(&self) -> Vec<&AttributeNode> {
        let mut out = Vec::new();
        for &r in &self.roots {
            self.collect_leaves(r, &mut out);
        }
        out
    }

    /// Leaves of the subtree rooted at `id` (the node itself when it is a leaf)
    pub fn leaves_under(&self, id: &str) -> Vec<&AttributeNode> {
        let mut out = Vec::new();
        if let Some(&i) = self.index.get(id) {
            self.collect_leaves(i, &mut out);
        }
        out
    }

    fn collect_leaves<'a>(&'a self, start: usize, out: &mut Vec<&'a AttributeNode>) {
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            let entry = &self.entries[i];
            if entry.children.is_empty() {
                out.push(&entry.node);
            } else {
                stack.extend(entry.children.iter().rev());
            }
        }
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }
}

fn check_depth(node: &AttributeNode, expected: u32) -> Result<(), TreeError> {
    if node.depth != expected {
        return Err(TreeError::DepthMismatch {
            id: node.id.clone(),
            expected,
            found: node.depth,
        });
    }
    Ok(())
}
