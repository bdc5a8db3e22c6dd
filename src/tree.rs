use crate::{
    error::LoadError, tick_child_node, Child, ExecutionContext, Node, Registry, TickResult,
};
use tracing::debug;

/// A root node bound to one agent and one private [`ExecutionContext`].
///
/// The root is shared: any number of `BehaviorTree`s may tick the same node
/// graph, each with its own agent, without seeing each other's progress.
pub struct BehaviorTree<A> {
    root: Node<A>,
    agent: A,
    context: ExecutionContext,
}

impl<A> BehaviorTree<A> {
    pub fn new(root: Node<A>, agent: A) -> Self {
        Self::with_context(root, agent, ExecutionContext::new())
    }

    /// Uses the given context, e.g. one made with [`ExecutionContext::with_seed`].
    pub fn with_context(root: Node<A>, agent: A, context: ExecutionContext) -> Self {
        Self {
            root,
            agent,
            context,
        }
    }

    /// Builds a tree whose root may be given by registered name.
    pub fn from_registry(
        registry: &Registry<A>,
        root: impl Into<Child<A>>,
        agent: A,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(registry.resolve_child(root.into())?, agent))
    }

    /// Ticks the whole tree once.
    ///
    /// Errors abort the tick immediately and leave the context as it was at
    /// that point; call [`BehaviorTree::reset`] to start over.
    pub fn run(&mut self) -> TickResult {
        tick_child_node(&*self.root, &mut self.agent, &mut self.context)
    }

    /// Binds another agent and returns the previous one.
    ///
    /// The context is reset, so the new agent starts from the top of the
    /// tree. Nodes that were running for the previous agent are dropped
    /// without their `on_finish` hooks being called.
    pub fn set_agent(&mut self, agent: A) -> A {
        if !self.context.is_empty() {
            debug!(
                live_nodes = self.context.len(),
                "agent replaced while running, resetting the tree"
            );
        }
        self.context.clear();
        std::mem::replace(&mut self.agent, agent)
    }

    /// Forgets all progress, so the next tick starts from the root.
    /// No hooks are called.
    pub fn reset(&mut self) {
        self.context.clear();
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn into_agent(self) -> A {
        self.agent
    }

    pub fn root(&self) -> &Node<A> {
        &self.root
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}
