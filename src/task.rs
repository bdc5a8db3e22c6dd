use crate::{
    context::memory_slot, error::TickError, nodes::Hooks, BehaviorNode, ExecutionContext, NodeId,
    Outcome, TickResult,
};
use std::any::Any;

type RunFn<A> = Box<dyn Fn(&mut Control, &mut A) + Send + Sync>;

/// The handle a [`Task`] reports its outcome through.
///
/// Exactly one of [`Control::succeed`], [`Control::fail`] or
/// [`Control::running`] must be called per tick. Calling none of them, or
/// more than one, makes the tick fail with [`TickError::InvalidOutcome`].
#[derive(Debug)]
pub struct Control {
    outcome: Option<Outcome>,
    calls: usize,
    memory: Option<Box<dyn Any + Send>>,
}

impl Control {
    fn new(memory: Option<Box<dyn Any + Send>>) -> Self {
        Self {
            outcome: None,
            calls: 0,
            memory,
        }
    }

    pub fn succeed(&mut self) {
        self.report(Outcome::Succeeded);
    }

    pub fn fail(&mut self) {
        self.report(Outcome::Failed);
    }

    /// Asks to be ticked again on the next tick.
    pub fn running(&mut self) {
        self.report(Outcome::Running);
    }

    /// State that survives across ticks while the task keeps running, and is
    /// dropped once it succeeds or fails. It is private to the agent.
    pub fn memory<T: Any + Send + Default>(&mut self) -> &mut T {
        memory_slot(&mut self.memory)
    }

    fn report(&mut self, outcome: Outcome) {
        self.calls += 1;
        self.outcome = Some(outcome);
    }
}

/// A leaf node running user code.
pub struct Task<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    run: RunFn<A>,
}

impl<A> Task<A> {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&mut Control, &mut A) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            hooks: Hooks::default(),
            run: Box::new(run),
        }
    }

    /// A task that succeeds if the predicate holds and fails otherwise.
    pub fn condition(
        name: impl Into<String>,
        predicate: impl Fn(&mut A) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |ctl: &mut Control, agent: &mut A| {
            if predicate(agent) {
                ctl.succeed();
            } else {
                ctl.fail();
            }
        })
    }
}

node_builders!(Task);

impl<A> BehaviorNode<A> for Task<A> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&self, agent: &mut A) {
        self.hooks.start(agent);
    }

    fn on_finish(&self, agent: &mut A) {
        self.hooks.finish(agent);
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        let mut control = Control::new(ctx.take_memory(self.id));
        (self.run)(&mut control, agent);

        let Control {
            outcome,
            calls,
            memory,
        } = control;
        ctx.put_memory(self.id, memory);

        match (calls, outcome) {
            (1, Some(outcome)) => Ok(outcome),
            _ => Err(TickError::InvalidOutcome {
                node: self.name.clone(),
                calls,
            }),
        }
    }
}
