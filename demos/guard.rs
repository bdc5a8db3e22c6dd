//! A guard that patrols until it spots an intruder, then chases and attacks.
//!
//! Run with `RUST_LOG=agent_behavior_tree=trace` to see every node start and finish.

use agent_behavior_tree::{
    BehaviorTree, Control, Decorator, ExecutionContext, Outcome, Priority, Random, Registry,
    Sequence, Task,
};

#[derive(Debug, Default)]
struct Guard {
    position: i32,
    intruder: Option<i32>,
}

fn registry() -> Registry<Guard> {
    let mut registry = Registry::default();
    registry.register(
        "see_intruder",
        Task::condition("see_intruder", |guard: &mut Guard| {
            guard
                .intruder
                .map_or(false, |pos| (pos - guard.position).abs() <= 3)
        })
        .into_node(),
    );
    registry.register(
        "chase",
        Task::new("chase", |ctl: &mut Control, guard: &mut Guard| {
            match guard.intruder {
                Some(pos) if pos == guard.position => ctl.succeed(),
                Some(pos) => {
                    guard.position += (pos - guard.position).signum();
                    println!("chasing, now at {}", guard.position);
                    ctl.running();
                }
                None => ctl.fail(),
            }
        })
        .on_start(|_: &mut Guard| println!("intruder spotted!"))
        .into_node(),
    );
    registry.register(
        "attack",
        Task::new("attack", |ctl: &mut Control, guard: &mut Guard| {
            println!("attacking at {}", guard.position);
            guard.intruder = None;
            ctl.succeed();
        })
        .into_node(),
    );
    registry.register(
        "step_left",
        Task::new("step_left", |ctl: &mut Control, guard: &mut Guard| {
            guard.position -= 1;
            ctl.succeed();
        })
        .into_node(),
    );
    registry.register(
        "step_right",
        Task::new("step_right", |ctl: &mut Control, guard: &mut Guard| {
            guard.position += 1;
            ctl.succeed();
        })
        .into_node(),
    );
    registry
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut registry = registry();
    let hunt = Sequence::resolve(&registry, ["see_intruder", "chase", "attack"])?
        .named("hunt")
        .into_node();
    let patrol = Decorator::always_succeed(
        Random::resolve(&registry, ["step_left", "step_right"])?.into_node(),
    )
    .named("patrol")
    .into_node();
    registry.register("main", Priority::new(vec![hunt, patrol]).into_node());

    let mut tree = BehaviorTree::with_context(
        registry.resolve("main")?,
        Guard::default(),
        ExecutionContext::with_seed(1),
    );

    for tick in 0..20 {
        if tick == 5 {
            let position = tree.agent().position;
            tree.agent_mut().intruder = Some(position + 3);
        }
        let outcome = tree.run()?;
        println!("tick {:2}: {:?} {:?}", tick, outcome, tree.agent());
        if tick > 5 && outcome == Outcome::Succeeded && tree.agent().intruder.is_none() {
            break;
        }
    }

    Ok(())
}
