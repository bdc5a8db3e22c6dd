//! # agent-behavior-tree
//!
//! A behavior tree engine for game and agent AI, where many agents share one
//! tree definition but each of them progresses through it independently.
//!
//!
//! ## Overview
//!
//! A behavior tree is evaluated once per tick against a controlled subject,
//! the *agent*. Every node returns one of three outcomes:
//! [`Outcome::Succeeded`], [`Outcome::Failed`] or [`Outcome::Running`].
//! A `Running` node is resumed on the next tick exactly where it left off.
//!
//! Nodes are immutable once built. They are handed around as [`Node`], which
//! is an `Arc` of a trait object, so the same node can appear in many trees
//! and be ticked by many agents at once, even from different threads.
//! Everything a tree must remember between ticks lives in an
//! [`ExecutionContext`], which is owned by a [`BehaviorTree`] together with
//! its agent.
//!
//!
//! ## How it looks like
//!
//! First, define the agent. The engine never looks inside it; it only hands
//! it to your tasks.
//!
//! ```rust
//! struct Guard {
//!     stamina: u32,
//! }
//! ```
//!
//! Then define tasks. A task receives a [`Control`] handle and must call
//! exactly one of `succeed`, `fail` or `running` on it.
//!
//! ```rust
//! # struct Guard { stamina: u32 }
//! use agent_behavior_tree::{BehaviorTree, Control, Outcome, Sequence, Task};
//!
//! let rest = Task::new("rest", |ctl: &mut Control, guard: &mut Guard| {
//!     guard.stamina += 1;
//!     if guard.stamina >= 3 {
//!         ctl.succeed();
//!     } else {
//!         ctl.running();
//!     }
//! })
//! .into_node();
//! let patrol = Task::condition("patrol", |guard: &mut Guard| guard.stamina > 0).into_node();
//!
//! let root = Sequence::new(vec![rest, patrol]).into_node();
//!
//! // Two guards share the very same nodes.
//! let mut alice = BehaviorTree::new(root.clone(), Guard { stamina: 0 });
//! let mut bob = BehaviorTree::new(root, Guard { stamina: 2 });
//!
//! assert_eq!(alice.run()?, Outcome::Running);
//! assert_eq!(bob.run()?, Outcome::Succeeded);
//! assert_eq!(alice.run()?, Outcome::Running);
//! assert_eq!(alice.run()?, Outcome::Succeeded);
//! # Ok::<(), agent_behavior_tree::error::TickError>(())
//! ```
//!
//!
//! ## Node types
//!
//! * [`Task`] wraps user code and optional `on_start` / `on_finish` hooks.
//! * [`Sequence`] ticks its children in order until one fails (AND).
//! * [`Priority`] ticks its children in order until one succeeds (OR).
//! * [`Random`] picks one child at random, uniformly or by weight.
//! * [`Decorator`] transforms the outcome of a single child:
//!   transparent, invert, always succeed or always fail.
//! * [`Repeat`] and [`Retry`] run their child several times across ticks.
//!
//! Composites remember which child was running and resume there instead of
//! restarting from the first child. `on_start` fires once when a node is
//! entered, and `on_finish` fires once when it leaves the running state.
//!
//!
//! ## Building trees by name
//!
//! A [`Registry`] maps names to nodes, so children can be referred to by a
//! string. Names are resolved once while building, never while ticking.
//!
//! ```rust
//! use agent_behavior_tree::{BehaviorTree, Control, Outcome, Priority, Registry, Task};
//!
//! let mut registry = Registry::default();
//! registry.register("flee", Task::condition("flee", |hp: &mut u32| *hp < 10).into_node());
//! registry.register("fight", Task::new("fight", |ctl: &mut Control, _: &mut u32| ctl.succeed()).into_node());
//!
//! let root = Priority::resolve(&registry, ["flee", "fight"])?.into_node();
//! registry.register("combat", root);
//!
//! let mut tree = BehaviorTree::from_registry(&registry, "combat", 50)?;
//! assert_eq!(tree.run()?, Outcome::Succeeded);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//!
//! ## The definition file format
//!
//! Tree shapes can also be written in a small text format and loaded into a
//! registry with [`load_str`]. Every `tree` becomes a registry entry, and a
//! tree can use any other tree of the same file as a subtree.
//!
//! ```raw
//! # Line comments start with a hash.
//! tree main = Priority {
//!     Sequence {
//!         !rested          # `!x` is a shorthand for `Invert { x }`
//!         rest
//!     }
//!     Random (weights = [3, 1]) {
//!         patrol
//!         idle
//!     }
//!     Retry (n = 3) { open_door }
//! }
//! ```
//!
//! The built-in node names are `Sequence`, `Priority` (or `Selector`,
//! `Fallback`), `Random`, `Transparent`, `Invert` (or `Inverter`),
//! `AlwaysSucceed` (or `ForceSuccess`), `AlwaysFail` (or `ForceFailure`),
//! `Repeat` and `Retry`. Any other name refers to a tree in the same file,
//! or else to a node in the registry.
//!
//! The same structure can be written in YAML and loaded with [`load_yaml`].
//!
//! ```yaml
//! behavior_tree:
//!   main:
//!     type: Sequence
//!     children:
//!     - type: rest
//!     - type: Repeat
//!       args:
//!         n: 2
//!       children:
//!       - type: patrol
//! ```
//!
//!
//! ## Concurrency
//!
//! A tick runs synchronously, depth first and left to right. Suspension is
//! only data: a `Running` outcome plus what the context remembers. Nodes are
//! `Send + Sync`, so trees for different agents can be ticked on different
//! threads as long as each owns its own context, which [`BehaviorTree`]
//! guarantees.

/// Generates the builder methods shared by every node type: lifecycle
/// hooks, renaming and conversion into a shared [`Node`].
///
/// The type must have `name: String` and `hooks: Hooks<A>` fields.
macro_rules! node_builders {
    ($ty:ident) => {
        impl<A> $ty<A> {
            /// Sets a hook called when the node is entered, but not when it is resumed.
            pub fn on_start(mut self, hook: impl Fn(&mut A) + Send + Sync + 'static) -> Self {
                self.hooks.on_start = Some(Box::new(hook));
                self
            }

            /// Sets a hook called when the node leaves the running state.
            pub fn on_finish(mut self, hook: impl Fn(&mut A) + Send + Sync + 'static) -> Self {
                self.hooks.on_finish = Some(Box::new(hook));
                self
            }

            /// Renames the node. The name shows up in logs and errors.
            pub fn named(mut self, name: impl Into<String>) -> Self {
                self.name = name.into();
                self
            }

            /// Wraps the node for sharing between trees.
            pub fn into_node(self) -> $crate::Node<A>
            where
                A: 'static,
            {
                std::sync::Arc::new(self)
            }
        }
    };
}

mod context;
pub mod error;
mod nodes;
pub mod parser;
mod registry;
mod task;
mod tree;

use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

pub use crate::context::ExecutionContext;
pub use crate::error::{LoadError, TickError, TickResult};
pub use crate::nodes::{Decorator, DecoratorKind, Priority, Random, Repeat, Retry, Sequence};
pub use crate::parser::{load, load_str, load_yaml, parse_file, parse_yaml};
pub use crate::registry::{Child, Registry};
pub use crate::task::{Control, Task};
pub use crate::tree::BehaviorTree;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum Outcome {
    Succeeded,
    Failed,
    /// The node should keep running in the next tick
    Running,
}

impl Outcome {
    /// Returns true for `Succeeded` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Outcome::Running)
    }

    /// Swaps `Succeeded` and `Failed`. `Running` is unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Outcome::Succeeded => Outcome::Failed,
            Outcome::Failed => Outcome::Succeeded,
            Outcome::Running => Outcome::Running,
        }
    }
}

/// Process-wide identity of a node, used as the key of its state in an
/// [`ExecutionContext`].
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates an identifier that no other node in this process has.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NodeId {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// A shared, immutable node. Cloning it is cheap and yields the same node.
pub type Node<A> = Arc<dyn BehaviorNode<A>>;

/// A node of a behavior tree, generic over the agent type `A`.
///
/// Implementors must not keep any per-run state in `self`; use the
/// [`ExecutionContext`] instead. Call [`tick_child_node`] rather than
/// [`BehaviorNode::run`] to tick a child, so its lifecycle hooks fire.
pub trait BehaviorNode<A>: Send + Sync {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    fn children(&self) -> &[Node<A>] {
        &[]
    }

    fn on_start(&self, _agent: &mut A) {}

    fn on_finish(&self, _agent: &mut A) {}

    /// The node's own behavior for one tick, without lifecycle handling.
    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult;
}

/// Ticks a node once, firing `on_start` when it is entered and `on_finish`
/// when it returns a terminal outcome.
///
/// A node that returns `Running` keeps its state in `ctx` and is resumed
/// without another `on_start` on the next tick. A node that returns a
/// terminal outcome has its state removed, so the next visit starts afresh.
/// Errors are returned as they are, without firing `on_finish`.
pub fn tick_child_node<A, N>(node: &N, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult
where
    N: BehaviorNode<A> + ?Sized,
{
    let id = node.id();
    if !ctx.is_started(id) {
        trace!(node = node.name(), %id, "start");
        node.on_start(agent);
        ctx.record_mut(id).started = true;
    }

    let outcome = node.run(agent, ctx)?;

    if outcome.is_terminal() {
        trace!(node = node.name(), %id, ?outcome, "finish");
        node.on_finish(agent);
        ctx.finish(id);
    }

    Ok(outcome)
}
