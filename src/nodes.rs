use crate::{
    error::{LoadError, TickError},
    tick_child_node, BehaviorNode, Child, ExecutionContext, Node, NodeId, Outcome, Registry,
    TickResult,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

pub(crate) type Hook<A> = Box<dyn Fn(&mut A) + Send + Sync>;

/// The optional `on_start` / `on_finish` callbacks of a node.
pub(crate) struct Hooks<A> {
    pub(crate) on_start: Option<Hook<A>>,
    pub(crate) on_finish: Option<Hook<A>>,
}

impl<A> Default for Hooks<A> {
    fn default() -> Self {
        Self {
            on_start: None,
            on_finish: None,
        }
    }
}

impl<A> Hooks<A> {
    pub(crate) fn start(&self, agent: &mut A) {
        if let Some(hook) = &self.on_start {
            hook(agent);
        }
    }

    pub(crate) fn finish(&self, agent: &mut A) {
        if let Some(hook) = &self.on_finish {
            hook(agent);
        }
    }
}

/// Implements the parts of [`BehaviorNode`] that only forward to fields.
macro_rules! node_accessors {
    () => {
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
    };
}

/// Ticks `children` from the one left running (or the first), stopping at
/// the first child that returns `Running` or `decisive`.
fn tick_in_order<A>(
    id: NodeId,
    children: &[Node<A>],
    agent: &mut A,
    ctx: &mut ExecutionContext,
    decisive: Outcome,
    exhausted: Outcome,
) -> TickResult {
    let from = ctx.running_index(id).unwrap_or(0);
    for (index, child) in children.iter().enumerate().skip(from) {
        match tick_child_node(&**child, agent, ctx)? {
            Outcome::Running => {
                ctx.set_running_index(id, Some(index));
                return Ok(Outcome::Running);
            }
            outcome if outcome == decisive => {
                ctx.set_running_index(id, None);
                return Ok(outcome);
            }
            _ => (),
        }
    }
    ctx.set_running_index(id, None);
    Ok(exhausted)
}

/// Executes children in order until one fails.
///
/// - `Failed` stops the sequence immediately and it fails.
/// - `Running` suspends the sequence; the next tick resumes at the same
///   child, without ticking the ones before it again.
/// - If every child succeeds, the sequence succeeds. So does an empty one.
pub struct Sequence<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    children: Vec<Node<A>>,
}

impl<A> Sequence<A> {
    pub fn new(children: impl IntoIterator<Item = Node<A>>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: "Sequence".to_owned(),
            hooks: Hooks::default(),
            children: children.into_iter().collect(),
        }
    }

    /// Builds a sequence whose children may be given by registered name.
    pub fn resolve<C: Into<Child<A>>>(
        registry: &Registry<A>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(registry.resolve_all(children)?))
    }
}

node_builders!(Sequence);

impl<A> BehaviorNode<A> for Sequence<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        &self.children
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        tick_in_order(
            self.id,
            &self.children,
            agent,
            ctx,
            Outcome::Failed,
            Outcome::Succeeded,
        )
    }
}

/// Executes children in order until one succeeds. Also known as a selector
/// or fallback.
///
/// The mirror image of [`Sequence`]: `Succeeded` stops it immediately,
/// `Failed` moves on to the next child, and it fails when every child
/// fails, or when it has no children at all.
pub struct Priority<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    children: Vec<Node<A>>,
}

impl<A> Priority<A> {
    pub fn new(children: impl IntoIterator<Item = Node<A>>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: "Priority".to_owned(),
            hooks: Hooks::default(),
            children: children.into_iter().collect(),
        }
    }

    pub fn resolve<C: Into<Child<A>>>(
        registry: &Registry<A>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(registry.resolve_all(children)?))
    }
}

node_builders!(Priority);

impl<A> BehaviorNode<A> for Priority<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        &self.children
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        tick_in_order(
            self.id,
            &self.children,
            agent,
            ctx,
            Outcome::Succeeded,
            Outcome::Failed,
        )
    }
}

/// Ticks one child picked at random and returns its outcome.
///
/// While the picked child is running, it keeps being picked. Once it
/// finishes, the next tick draws again. Draws come from the random source of
/// the [`ExecutionContext`], so a seeded context makes them reproducible.
///
/// Ticking a `Random` without children is an error.
pub struct Random<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    children: Vec<Node<A>>,
    weights: Option<WeightedIndex<f64>>,
}

impl<A> Random<A> {
    /// Picks uniformly among the children.
    pub fn new(children: impl IntoIterator<Item = Node<A>>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: "Random".to_owned(),
            hooks: Hooks::default(),
            children: children.into_iter().collect(),
            weights: None,
        }
    }

    /// Picks each child with a probability proportional to its weight.
    ///
    /// Fails if there are no children, if a weight is negative or not finite,
    /// or if all weights are zero.
    pub fn weighted(children: impl IntoIterator<Item = (Node<A>, f64)>) -> Result<Self, LoadError> {
        let (children, weights): (Vec<_>, Vec<_>) = children.into_iter().unzip();
        let weights = WeightedIndex::new(&weights).map_err(|err| LoadError::InvalidWeights {
            node: "Random".to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            weights: Some(weights),
            ..Self::new(children)
        })
    }

    pub fn resolve<C: Into<Child<A>>>(
        registry: &Registry<A>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(registry.resolve_all(children)?))
    }
}

node_builders!(Random);

impl<A> BehaviorNode<A> for Random<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        &self.children
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        if self.children.is_empty() {
            return Err(TickError::EmptyComposite {
                node: self.name.clone(),
            });
        }

        let index = match ctx.running_index(self.id) {
            Some(index) => index,
            None => match &self.weights {
                Some(weights) => weights.sample(ctx.rng()),
                None => ctx.rng().gen_range(0..self.children.len()),
            },
        };

        let outcome = tick_child_node(&*self.children[index], agent, ctx)?;
        ctx.set_running_index(self.id, outcome.is_running().then_some(index));
        Ok(outcome)
    }
}

/// The built-in outcome transforms of a [`Decorator`].
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum DecoratorKind {
    /// Returns the child's outcome unchanged.
    Transparent,
    /// Swaps `Succeeded` and `Failed`.
    Invert,
    /// Turns `Failed` into `Succeeded`.
    AlwaysSucceed,
    /// Turns `Succeeded` into `Failed`.
    AlwaysFail,
}

impl DecoratorKind {
    /// Applies the transform. `Running` always passes through.
    pub fn apply(self, outcome: Outcome) -> Outcome {
        match (self, outcome) {
            (_, Outcome::Running) => Outcome::Running,
            (DecoratorKind::Transparent, outcome) => outcome,
            (DecoratorKind::Invert, outcome) => outcome.invert(),
            (DecoratorKind::AlwaysSucceed, _) => Outcome::Succeeded,
            (DecoratorKind::AlwaysFail, _) => Outcome::Failed,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DecoratorKind::Transparent => "Transparent",
            DecoratorKind::Invert => "Invert",
            DecoratorKind::AlwaysSucceed => "AlwaysSucceed",
            DecoratorKind::AlwaysFail => "AlwaysFail",
        }
    }
}

enum Transform {
    Builtin(DecoratorKind),
    Custom(Box<dyn Fn(Outcome) -> Outcome + Send + Sync>),
}

/// Wraps a single child and transforms its outcome.
///
/// The child is ticked every time the decorator is. Its resume state belongs
/// to the child, not to the decorator, so decorating a node never changes
/// when it starts or resumes.
pub struct Decorator<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    child: Node<A>,
    transform: Transform,
}

impl<A> Decorator<A> {
    pub fn new(kind: DecoratorKind, child: Node<A>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: kind.name().to_owned(),
            hooks: Hooks::default(),
            child,
            transform: Transform::Builtin(kind),
        }
    }

    pub fn transparent(child: Node<A>) -> Self {
        Self::new(DecoratorKind::Transparent, child)
    }

    pub fn invert(child: Node<A>) -> Self {
        Self::new(DecoratorKind::Invert, child)
    }

    pub fn always_succeed(child: Node<A>) -> Self {
        Self::new(DecoratorKind::AlwaysSucceed, child)
    }

    pub fn always_fail(child: Node<A>) -> Self {
        Self::new(DecoratorKind::AlwaysFail, child)
    }

    /// A decorator with a user-defined transform. The transform only sees
    /// terminal outcomes; `Running` is passed through before it is called.
    pub fn custom(
        name: impl Into<String>,
        child: Node<A>,
        transform: impl Fn(Outcome) -> Outcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            hooks: Hooks::default(),
            child,
            transform: Transform::Custom(Box::new(transform)),
        }
    }

    pub fn resolve(
        registry: &Registry<A>,
        kind: DecoratorKind,
        child: impl Into<Child<A>>,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(kind, registry.resolve_child(child.into())?))
    }

    /// The built-in transform, or `None` for a custom decorator.
    pub fn kind(&self) -> Option<DecoratorKind> {
        match self.transform {
            Transform::Builtin(kind) => Some(kind),
            Transform::Custom(_) => None,
        }
    }
}

node_builders!(Decorator);

impl<A> BehaviorNode<A> for Decorator<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        std::slice::from_ref(&self.child)
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        let outcome = tick_child_node(&*self.child, agent, ctx)?;
        if outcome.is_running() {
            return Ok(Outcome::Running);
        }
        Ok(match &self.transform {
            Transform::Builtin(kind) => kind.apply(outcome),
            Transform::Custom(transform) => transform(outcome),
        })
    }
}

/// Runs its child until it has succeeded `n` times.
///
/// Each success of the child makes `Repeat` return `Running`, and the child
/// starts over on the next tick, until the last success, which makes it
/// succeed. A failure of the child makes it fail at once. `n == 0` succeeds
/// without ticking the child.
pub struct Repeat<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    child: Node<A>,
    times: usize,
}

impl<A> Repeat<A> {
    pub fn new(times: usize, child: Node<A>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: "Repeat".to_owned(),
            hooks: Hooks::default(),
            child,
            times,
        }
    }
}

node_builders!(Repeat);

impl<A> BehaviorNode<A> for Repeat<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        std::slice::from_ref(&self.child)
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        if self.times == 0 {
            return Ok(Outcome::Succeeded);
        }
        match tick_child_node(&*self.child, agent, ctx)? {
            Outcome::Succeeded => {
                let count = ctx.memory::<usize>(self.id);
                *count += 1;
                Ok(if *count >= self.times {
                    Outcome::Succeeded
                } else {
                    Outcome::Running
                })
            }
            outcome => Ok(outcome),
        }
    }
}

/// Runs its child until it succeeds, giving up after `n` failures.
///
/// Each failure but the last makes `Retry` return `Running`, and the child
/// starts over on the next tick. `n <= 1` passes the first failure through.
pub struct Retry<A> {
    id: NodeId,
    name: String,
    hooks: Hooks<A>,
    child: Node<A>,
    attempts: usize,
}

impl<A> Retry<A> {
    pub fn new(attempts: usize, child: Node<A>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: "Retry".to_owned(),
            hooks: Hooks::default(),
            child,
            attempts,
        }
    }
}

node_builders!(Retry);

impl<A> BehaviorNode<A> for Retry<A> {
    node_accessors!();

    fn children(&self) -> &[Node<A>] {
        std::slice::from_ref(&self.child)
    }

    fn run(&self, agent: &mut A, ctx: &mut ExecutionContext) -> TickResult {
        match tick_child_node(&*self.child, agent, ctx)? {
            Outcome::Failed => {
                let failures = ctx.memory::<usize>(self.id);
                *failures += 1;
                Ok(if *failures >= self.attempts {
                    Outcome::Failed
                } else {
                    Outcome::Running
                })
            }
            outcome => Ok(outcome),
        }
    }
}
