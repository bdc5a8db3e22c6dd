use crate::NodeId;
use rand::{rngs::SmallRng, SeedableRng};
use std::{any::Any, collections::HashMap};

/// The resumable state of a single node, as seen by a single agent.
#[derive(Default, Debug)]
pub(crate) struct NodeState {
    pub(crate) started: bool,
    pub(crate) running_index: Option<usize>,
    pub(crate) memory: Option<Box<dyn Any + Send>>,
}

/// Per-agent store of everything a tree needs to resume on the next tick.
///
/// Node objects are shared between every tree that uses them, so they cannot
/// remember anything about a particular run. Instead, each [`crate::BehaviorTree`]
/// owns one `ExecutionContext`, which maps node identity to the node's
/// progress: whether it has been started, which child a composite left
/// running, and whatever typed memory a task or decorator asked for.
///
/// A record is removed as soon as its node returns a terminal outcome, so an
/// idle tree has an empty context.
///
/// The context also owns the random number generator used by
/// [`crate::Random`], which makes stochastic trees reproducible with
/// [`ExecutionContext::with_seed`].
#[derive(Debug)]
pub struct ExecutionContext {
    records: HashMap<NodeId, NodeState>,
    rng: SmallRng,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Creates an empty context whose random source is seeded from the OS.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Creates an empty context with a deterministic random source.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            records: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Returns true if the node has fired `on_start` without a matching `on_finish`.
    pub fn is_started(&self, id: NodeId) -> bool {
        self.records.get(&id).map_or(false, |state| state.started)
    }

    /// Returns the index of the child a composite left running, if any.
    pub fn running_index(&self, id: NodeId) -> Option<usize> {
        self.records.get(&id).and_then(|state| state.running_index)
    }

    /// Number of nodes that currently hold any state.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forgets the progress of every node. The random source is kept.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Returns the typed memory slot of a node, creating it with
    /// `T::default()` if it is absent or holds a different type.
    ///
    /// The slot lives as long as the node's record, i.e. until the node
    /// returns a terminal outcome.
    pub fn memory<T: Any + Send + Default>(&mut self, id: NodeId) -> &mut T {
        memory_slot(&mut self.record_mut(id).memory)
    }

    pub(crate) fn record_mut(&mut self, id: NodeId) -> &mut NodeState {
        self.records.entry(id).or_default()
    }

    pub(crate) fn set_running_index(&mut self, id: NodeId, index: Option<usize>) {
        self.record_mut(id).running_index = index;
    }

    pub(crate) fn take_memory(&mut self, id: NodeId) -> Option<Box<dyn Any + Send>> {
        self.records.get_mut(&id).and_then(|state| state.memory.take())
    }

    pub(crate) fn put_memory(&mut self, id: NodeId, memory: Option<Box<dyn Any + Send>>) {
        self.record_mut(id).memory = memory;
    }

    pub(crate) fn finish(&mut self, id: NodeId) {
        self.records.remove(&id);
    }

    pub(crate) fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

pub(crate) fn memory_slot<T: Any + Send + Default>(slot: &mut Option<Box<dyn Any + Send>>) -> &mut T {
    let value = slot.get_or_insert_with(|| Box::new(T::default()) as Box<dyn Any + Send>);
    if !(**value).is::<T>() {
        *value = Box::new(T::default());
    }
    (**value)
        .downcast_mut::<T>()
        .expect("memory slot was just filled with the requested type")
}
