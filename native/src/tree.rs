//! Tree Module — Layout tree storage and CRUD operations.
//!
//! Responsibilities:
//! - Handle allocation (sequential u32, never recycled, 0 is invalid)
//! - Node creation/destruction
//! - Parent-child relationships (parent is a non-owning back-reference)
//! - Depth-first lookup by ID
//! - Dirty-flag propagation to ancestors
//! - Building a node tree from a virtual element tree

use std::collections::{BTreeMap, HashMap};

use crate::element::Element;
use crate::error::{LotusError, Result};
use crate::stylesheet::format_declarations;
use crate::types::{ComputedStyle, NodeType};

pub type NodeHandle = u32;

#[derive(Debug, Clone)]
pub struct Node {
    pub node_type: NodeType,
    pub id: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub style: ComputedStyle,
    pub children: Vec<NodeHandle>,
    pub parent: Option<NodeHandle>,
    pub content: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub dirty: bool,
}

impl Node {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            id: String::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            style: ComputedStyle::default(),
            children: Vec::new(),
            parent: None,
            content: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            dirty: true,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Arena of nodes addressed by handle. The arena is the only owner; both
/// `children` and `parent` are handles into it.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: HashMap<NodeHandle, Node>,
    next_handle: NodeHandle,
    root: Option<NodeHandle>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_handle: 1, // Handle(0) is permanently invalid
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn set_root(&mut self, handle: NodeHandle) -> Result<()> {
        self.validate(handle)?;
        self.root = Some(handle);
        self.mark_dirty(handle);
        Ok(())
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(&handle)
    }

    /// Like [`get`](Self::get) but reports the bad handle.
    pub fn node(&self, handle: NodeHandle) -> Result<&Node> {
        self.nodes
            .get(&handle)
            .ok_or(LotusError::InvalidHandle(handle))
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut Node> {
        self.nodes
            .get_mut(&handle)
            .ok_or(LotusError::InvalidHandle(handle))
    }

    fn validate(&self, handle: NodeHandle) -> Result<()> {
        if handle == 0 || !self.nodes.contains_key(&handle) {
            return Err(LotusError::InvalidHandle(handle));
        }
        Ok(())
    }

    /// Allocate a new handle and insert a detached node.
    pub fn create_node(&mut self, node_type: NodeType) -> NodeHandle {
        self.insert(Node::new(node_type))
    }

    /// Insert a prepared node. Its `children`/`parent` links are reset; use
    /// [`append_child`](Self::append_child) to attach it.
    pub fn insert(&mut self, mut node: Node) -> NodeHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        node.children.clear();
        node.parent = None;
        node.dirty = true;
        tracing::trace!(handle, node_type = node.node_type.name(), "create_node");
        self.nodes.insert(handle, node);
        handle
    }

    /// Convenience for building trees by hand: create a node with an ID and
    /// attach it under `parent` (or make it the root when `parent` is `None`
    /// and no root exists yet).
    pub fn add_node(
        &mut self,
        parent: Option<NodeHandle>,
        node_type: NodeType,
        id: &str,
    ) -> Result<NodeHandle> {
        let mut node = Node::new(node_type);
        node.id = id.to_string();
        let handle = self.insert(node);
        match parent {
            Some(p) => self.append_child(p, handle)?,
            None if self.root.is_none() => self.root = Some(handle),
            None => {}
        }
        Ok(handle)
    }

    /// Append a child to a parent node, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.validate(parent)?;
        self.validate(child)?;

        if self.node(parent)?.node_type.is_leaf() {
            return Err(LotusError::LeafNode(parent));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(LotusError::Cycle { parent, child });
        }

        if let Some(old_parent) = self.node(child)?.parent {
            if let Some(old) = self.nodes.get_mut(&old_parent) {
                old.children.retain(|&h| h != child);
            }
            self.mark_dirty(old_parent);
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        if self.root == Some(child) {
            self.root = None;
        }
        self.mark_dirty(parent);
        Ok(())
    }

    /// Insert a child at a specific position among the parent's children.
    pub fn insert_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
        index: usize,
    ) -> Result<()> {
        self.append_child(parent, child)?;
        let children = &mut self.node_mut(parent)?.children;
        if let Some(last) = children.pop() {
            let at = index.min(children.len());
            children.insert(at, last);
        }
        Ok(())
    }

    /// Detach a child from its parent. The child stays in the arena.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.validate(child)?;
        let p = self.node_mut(parent)?;
        let before = p.children.len();
        p.children.retain(|&h| h != child);
        if p.children.len() == before {
            return Err(LotusError::InvalidHandle(child));
        }
        self.node_mut(child)?.parent = None;
        self.mark_dirty(parent);
        Ok(())
    }

    /// Destroy a node and every descendant.
    pub fn destroy_subtree(&mut self, handle: NodeHandle) -> Result<()> {
        self.validate(handle)?;
        if let Some(parent) = self.node(handle)?.parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|&h| h != handle);
            }
            self.mark_dirty(parent);
        }

        let doomed = self.descendants(handle);
        for h in &doomed {
            self.nodes.remove(h);
        }
        if self.root.is_some_and(|r| doomed.contains(&r)) {
            self.root = None;
        }
        tracing::trace!(handle, removed = doomed.len(), "destroy_subtree");
        Ok(())
    }

    /// Pre-order list of `handle` and all its descendants.
    pub fn descendants(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            let Some(node) = self.nodes.get(&h) else {
                continue;
            };
            out.push(h);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Pre-order walk from the root.
    pub fn walk(&self) -> Vec<NodeHandle> {
        self.root.map(|r| self.descendants(r)).unwrap_or_default()
    }

    /// Parent chain, nearest first. Does not include `handle` itself.
    pub fn ancestors(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        let mut current = self.nodes.get(&handle).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let h = current?;
            current = self.nodes.get(&h).and_then(|n| n.parent);
            Some(h)
        })
    }

    /// Depth-first search from the root in child order. Empty IDs never match.
    pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        if id.is_empty() {
            return None;
        }
        let mut stack = vec![self.root?];
        while let Some(h) = stack.pop() {
            let node = self.nodes.get(&h)?;
            if node.id == id {
                return Some(h);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Mark a node and its ancestors dirty.
    pub fn mark_dirty(&mut self, handle: NodeHandle) {
        let mut current = Some(handle);
        while let Some(h) = current {
            match self.nodes.get_mut(&h) {
                Some(node) => {
                    node.dirty = true;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    pub fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = false;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.nodes.values().any(|n| n.dirty)
    }

    // ========================================================================
    // Element → Node
    // ========================================================================

    /// Build a fresh tree from a virtual element tree. Components are
    /// expanded by rendering them; a component's ID is carried onto the root
    /// of what it renders so patches can address it.
    pub fn from_element(element: &Element) -> Self {
        let mut tree = Self::new();
        let root = tree.build_element(element);
        tree.root = Some(root);
        tree
    }

    /// Build an element subtree into this arena, detached. Returns its handle.
    pub fn build_element(&mut self, element: &Element) -> NodeHandle {
        match element {
            Element::Markup { id, text } => {
                let mut node = Node::new(NodeType::Text);
                node.id = id.clone();
                node.content = text.clone();
                self.insert(node)
            }
            Element::Component { id, component } => {
                let rendered = component.render();
                let handle = self.build_element(&rendered);
                if !id.is_empty() {
                    if let Some(node) = self.nodes.get_mut(&handle) {
                        node.id = id.clone();
                    }
                }
                handle
            }
            Element::Container {
                id,
                children,
                inline_styles,
            } => {
                let mut node = Node::new(NodeType::Box);
                node.id = id.clone();
                if !inline_styles.is_empty() {
                    node.attributes
                        .insert("style".to_string(), format_declarations(inline_styles));
                }
                let handle = self.insert(node);
                for child in children {
                    let c = self.build_element(child);
                    // Containers are boxes and `c` is fresh, so this cannot fail.
                    let _ = self.append_child(handle, c);
                }
                handle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn sample() -> (NodeTree, NodeHandle, NodeHandle, NodeHandle) {
        let mut tree = NodeTree::new();
        let root = tree.add_node(None, NodeType::Box, "root").unwrap();
        let a = tree.add_node(Some(root), NodeType::Box, "a").unwrap();
        let t = tree.add_node(Some(a), NodeType::Text, "label").unwrap();
        (tree, root, a, t)
    }

    #[test]
    fn test_handles_start_at_one() {
        let mut tree = NodeTree::new();
        assert_eq!(tree.create_node(NodeType::Box), 1);
        assert_eq!(tree.create_node(NodeType::Text), 2);
        assert!(matches!(tree.node(0), Err(LotusError::InvalidHandle(0))));
    }

    #[test]
    fn test_append_and_parent_links() {
        let (tree, root, a, t) = sample();
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.node(a).unwrap().parent, Some(root));
        assert_eq!(tree.node(root).unwrap().children, vec![a]);
        assert_eq!(tree.ancestors(t).collect::<Vec<_>>(), vec![a, root]);
    }

    #[test]
    fn test_leaf_rejects_children() {
        let (mut tree, _, _, t) = sample();
        let extra = tree.create_node(NodeType::Text);
        assert!(matches!(
            tree.append_child(t, extra),
            Err(LotusError::LeafNode(_))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, root, a, _) = sample();
        assert!(matches!(
            tree.append_child(a, root),
            Err(LotusError::Cycle { .. })
        ));
        assert!(matches!(
            tree.append_child(a, a),
            Err(LotusError::Cycle { .. })
        ));
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let (mut tree, root, a, t) = sample();
        let b = tree.add_node(Some(root), NodeType::Box, "b").unwrap();
        tree.append_child(b, t).unwrap();
        assert!(tree.node(a).unwrap().children.is_empty());
        assert_eq!(tree.node(b).unwrap().children, vec![t]);
        assert_eq!(tree.node(t).unwrap().parent, Some(b));
    }

    #[test]
    fn test_insert_child_at_index() {
        let (mut tree, root, a, _) = sample();
        let first = tree.create_node(NodeType::Box);
        tree.insert_child(root, first, 0).unwrap();
        assert_eq!(tree.node(root).unwrap().children, vec![first, a]);
    }

    #[test]
    fn test_find_by_id_depth_first() {
        let (tree, _, _, t) = sample();
        assert_eq!(tree.find_by_id("label"), Some(t));
        assert_eq!(tree.find_by_id("missing"), None);
        assert_eq!(tree.find_by_id(""), None);
    }

    #[test]
    fn test_destroy_subtree() {
        let (mut tree, root, a, t) = sample();
        tree.destroy_subtree(a).unwrap();
        assert!(tree.get(a).is_none());
        assert!(tree.get(t).is_none());
        assert!(tree.node(root).unwrap().children.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_dirty_propagates_to_ancestors() {
        let (mut tree, root, a, t) = sample();
        tree.clear_dirty();
        tree.mark_dirty(t);
        assert!(tree.node(t).unwrap().dirty);
        assert!(tree.node(a).unwrap().dirty);
        assert!(tree.node(root).unwrap().dirty);
    }

    #[test]
    fn test_from_element() {
        let el = Element::container(
            "root",
            [("color", "red")],
            vec![Element::markup("title", "Hello"), Element::markup("", "x")],
        );
        let tree = NodeTree::from_element(&el);
        let root = tree.root().unwrap();
        let node = tree.node(root).unwrap();
        assert_eq!(node.node_type, NodeType::Box);
        assert_eq!(node.attr("style"), Some("color: red"));
        assert_eq!(node.children.len(), 2);

        let title = tree.find_by_id("title").unwrap();
        assert_eq!(tree.node(title).unwrap().content, "Hello");
        assert_eq!(tree.node(title).unwrap().node_type, NodeType::Text);
    }
}
