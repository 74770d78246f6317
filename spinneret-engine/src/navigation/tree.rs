//! In-memory tree of previously taken click paths.
//!
//! Arena storage: nodes live in a `Vec`, cross-references are indices. Nodes
//! are never deleted, so handles stay valid for the life of the crawl. Keys
//! are the clicked element's visible text, the only identity that survives
//! DOM re-renders.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct NavNode {
    pub parent: Option<NodeId>,
    /// Visible text of the click target; `None` only for the root.
    pub key: Option<String>,
    /// Clicks from the root; the node's own selector level is `level - 1`.
    pub level: usize,
    pub clicks: u32,
    pub children: Vec<NodeId>,
    /// Content fingerprints observed on arrival at this node. Two nodes may
    /// legitimately share a fingerprint (the UI returned to a seen state).
    pub fingerprints: Vec<u32>,
    /// Whether the most recent visit reproduced an already-known state.
    pub last_visit_duplicate: bool,
}

pub struct NavTree {
    nodes: Vec<NavNode>,
}

impl NavTree {
    /// A fresh tree whose root carries the fingerprint of the page before
    /// any click.
    pub fn new(root_fingerprint: u32) -> Self {
        Self {
            nodes: vec![NavNode {
                parent: None,
                key: None,
                level: 0,
                clicks: 0,
                children: Vec::new(),
                fingerprints: vec![root_fingerprint],
                last_visit_duplicate: false,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &NavNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NavNode {
        &mut self.nodes[id.0]
    }

    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).key.as_deref() == Some(key))
    }

    /// Add a child under `parent`. No two children of one parent may share a
    /// key; callers look up existing children first.
    pub fn add_child(&mut self, parent: NodeId, key: String) -> NodeId {
        debug_assert!(self.child_by_key(parent, &key).is_none());
        let level = self.node(parent).level + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(NavNode {
            parent: Some(parent),
            key: Some(key),
            level,
            clicks: 0,
            children: Vec::new(),
            fingerprints: Vec::new(),
            last_visit_duplicate: false,
        });
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn record_fingerprint(&mut self, id: NodeId, fingerprint: u32) {
        let node = self.node_mut(id);
        if !node.fingerprints.contains(&fingerprint) {
            node.fingerprints.push(fingerprint);
        }
    }

    /// First node (in creation order) that has observed `fingerprint`.
    pub fn find_fingerprint(&self, fingerprint: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.fingerprints.contains(&fingerprint))
            .map(NodeId)
    }

    /// Root-to-node key sequence. With `revisit`, keys carry the per-node
    /// click counter (`key#n`) so repeated visits stay distinguishable.
    pub fn path_keys(&self, id: NodeId, revisit: bool) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let Some(key) = &node.key {
                if revisit {
                    path.push(format!("{}#{}", key, node.clicks));
                } else {
                    path.push(key.clone());
                }
            }
            current = node.parent;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_holds_initial_fingerprint() {
        let tree = NavTree::new(42);
        assert_eq!(tree.node(tree.root()).fingerprints, vec![42]);
        assert_eq!(tree.node(tree.root()).level, 0);
    }

    #[test]
    fn test_child_lookup_by_key() {
        let mut tree = NavTree::new(0);
        let root = tree.root();
        let a = tree.add_child(root, "Details".to_string());
        tree.add_child(root, "Cancel".to_string());

        assert_eq!(tree.child_by_key(root, "Details"), Some(a));
        assert_eq!(tree.child_by_key(root, "Missing"), None);
        assert_eq!(tree.node(a).level, 1);
    }

    #[test]
    fn test_fingerprints_deduplicated_per_node() {
        let mut tree = NavTree::new(0);
        let root = tree.root();
        let child = tree.add_child(root, "More".to_string());
        tree.record_fingerprint(child, 7);
        tree.record_fingerprint(child, 7);
        assert_eq!(tree.node(child).fingerprints, vec![7]);
    }

    #[test]
    fn test_find_fingerprint_anywhere() {
        let mut tree = NavTree::new(1);
        let root = tree.root();
        let a = tree.add_child(root, "A".to_string());
        let b = tree.add_child(a, "B".to_string());
        tree.record_fingerprint(b, 9);

        assert_eq!(tree.find_fingerprint(1), Some(root));
        assert_eq!(tree.find_fingerprint(9), Some(b));
        assert_eq!(tree.find_fingerprint(5), None);
    }

    #[test]
    fn test_path_keys_with_and_without_counters() {
        let mut tree = NavTree::new(0);
        let root = tree.root();
        let a = tree.add_child(root, "Menu".to_string());
        let b = tree.add_child(a, "Item".to_string());
        tree.node_mut(a).clicks = 1;
        tree.node_mut(b).clicks = 2;

        assert_eq!(tree.path_keys(b, false), vec!["Menu", "Item"]);
        assert_eq!(tree.path_keys(b, true), vec!["Menu#1", "Item#2"]);
        assert!(tree.path_keys(root, true).is_empty());
    }
}
