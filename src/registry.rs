use crate::{error::LoadError, Node};
use std::collections::HashMap;
use tracing::warn;

/// A child given either as a node or as the name of a registered node.
pub enum Child<A> {
    Node(Node<A>),
    Named(String),
}

impl<A> From<Node<A>> for Child<A> {
    fn from(node: Node<A>) -> Self {
        Self::Node(node)
    }
}

impl<A> From<&str> for Child<A> {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl<A> From<String> for Child<A> {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// A name to node lookup.
///
/// Populate it at startup, then use it to build trees. Name references are
/// resolved once while building; a built tree holds the nodes themselves and
/// never consults the registry while ticking.
///
/// A registered node is shared, not copied: every tree built from the same
/// name ticks the same node, with per-agent state kept apart by each tree's
/// [`crate::ExecutionContext`]. As a consequence, a name used twice within one
/// tree refers to a single node with a single state record.
pub struct Registry<A> {
    nodes: HashMap<String, Node<A>>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }
}

impl<A> Registry<A> {
    /// Registers a node under `name`, returning the node it replaces.
    pub fn register(&mut self, name: impl ToString, node: Node<A>) -> Option<Node<A>> {
        let name = name.to_string();
        let previous = self.nodes.insert(name.clone(), node);
        if previous.is_some() {
            warn!(%name, "replaced a registered node");
        }
        previous
    }

    pub fn resolve(&self, name: &str) -> Result<Node<A>, LoadError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownNodeName(name.to_owned()))
    }

    pub fn resolve_child(&self, child: Child<A>) -> Result<Node<A>, LoadError> {
        match child {
            Child::Node(node) => Ok(node),
            Child::Named(name) => self.resolve(&name),
        }
    }

    /// Resolves a list of children, failing on the first unknown name.
    pub fn resolve_all<C: Into<Child<A>>>(
        &self,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Vec<Node<A>>, LoadError> {
        children
            .into_iter()
            .map(|child| self.resolve_child(child.into()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
