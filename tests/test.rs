use agent_behavior_tree::{
    load_str, BehaviorNode, BehaviorTree, Control, Decorator, DecoratorKind, ExecutionContext,
    LoadError, Node, Outcome, Priority, Random, Registry, Sequence, Task, TickError,
};
use std::thread;

#[derive(Default, Debug)]
struct Guard {
    steps_left: u32,
    enemy_visible: bool,
    events: Vec<String>,
}

impl Guard {
    fn walking(steps_left: u32) -> Self {
        Self {
            steps_left,
            ..Self::default()
        }
    }

    fn log(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }
}

/// Logs the start and finish hooks of a leaf under its name.
fn traced(task: Task<Guard>) -> Node<Guard> {
    let start = format!("{}:start", task.name());
    let finish = format!("{}:finish", task.name());
    task.on_start(move |guard: &mut Guard| guard.log(start.clone()))
        .on_finish(move |guard: &mut Guard| guard.log(finish.clone()))
        .into_node()
}

fn walk() -> Node<Guard> {
    traced(Task::new("walk", |ctl: &mut Control, guard: &mut Guard| {
        if guard.steps_left == 0 {
            ctl.succeed();
        } else {
            guard.steps_left -= 1;
            ctl.running();
        }
    }))
}

fn attack() -> Node<Guard> {
    traced(Task::new("attack", |ctl: &mut Control, guard: &mut Guard| {
        guard.log("attack");
        ctl.succeed();
    }))
}

fn spot() -> Node<Guard> {
    traced(Task::condition("spot", |guard: &mut Guard| guard.enemy_visible))
}

#[test]
fn test_sequence_resumes_running_child() -> anyhow::Result<()> {
    let root = Sequence::new(vec![walk(), attack()]).into_node();
    let mut tree = BehaviorTree::new(root, Guard::walking(1));

    assert_eq!(tree.run()?, Outcome::Running);
    assert_eq!(tree.agent().events, vec!["walk:start"]);

    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert_eq!(
        tree.agent().events,
        vec![
            "walk:start",
            "walk:finish",
            "attack:start",
            "attack",
            "attack:finish"
        ]
    );
    Ok(())
}

#[test]
fn test_priority_stops_at_first_success() -> anyhow::Result<()> {
    let root = Priority::new(vec![spot(), attack(), walk()]).into_node();
    let mut tree = BehaviorTree::new(root, Guard::walking(5));

    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert_eq!(
        tree.agent().events,
        vec![
            "spot:start",
            "spot:finish",
            "attack:start",
            "attack",
            "attack:finish"
        ]
    );
    // walk was never touched
    assert_eq!(tree.agent().steps_left, 5);
    Ok(())
}

#[test]
fn test_random_resumes_chosen_child() -> anyhow::Result<()> {
    let root = Random::new(vec![walk(), walk(), walk()]).into_node();
    for seed in 0..16 {
        let mut tree = BehaviorTree::with_context(
            root.clone(),
            Guard::walking(2),
            ExecutionContext::with_seed(seed),
        );
        assert_eq!(tree.run()?, Outcome::Running);
        assert_eq!(tree.run()?, Outcome::Running);
        assert_eq!(tree.run()?, Outcome::Succeeded);
        // One child started and finished, whatever later draws would have been.
        assert_eq!(tree.agent().events, vec!["walk:start", "walk:finish"]);
    }
    Ok(())
}

#[test]
fn test_agents_are_isolated() -> anyhow::Result<()> {
    let root = Sequence::new(vec![walk(), attack()]).into_node();
    let mut slow = BehaviorTree::new(root.clone(), Guard::walking(3));
    let mut quick = BehaviorTree::new(root, Guard::walking(0));

    assert_eq!(slow.run()?, Outcome::Running);
    assert_eq!(quick.run()?, Outcome::Succeeded);
    assert_eq!(slow.run()?, Outcome::Running);
    assert_eq!(quick.run()?, Outcome::Succeeded);

    assert!(quick.context().is_empty());
    assert!(!slow.context().is_empty());
    assert_eq!(slow.agent().events, vec!["walk:start"]);
    assert_eq!(quick.agent().events.len(), 10);
    Ok(())
}

#[test]
fn test_trees_on_threads() {
    let root = Sequence::new(vec![walk(), attack()]).into_node();
    let handles: Vec<_> = (0..4)
        .map(|steps| {
            let mut tree = BehaviorTree::new(root.clone(), Guard::walking(steps));
            thread::spawn(move || {
                let mut ticks = 1;
                while tree.run().unwrap() == Outcome::Running {
                    ticks += 1;
                }
                (steps, ticks)
            })
        })
        .collect();

    for handle in handles {
        let (steps, ticks) = handle.join().unwrap();
        assert_eq!(ticks, steps + 1);
    }
}

#[test]
fn test_set_agent_resets_progress() -> anyhow::Result<()> {
    let root = Sequence::new(vec![walk(), attack()]).into_node();
    let mut tree = BehaviorTree::new(root, Guard::walking(5));
    assert_eq!(tree.run()?, Outcome::Running);

    let previous = tree.set_agent(Guard::walking(0));
    assert!(tree.context().is_empty());
    // No finish hook for the interrupted walk.
    assert_eq!(previous.events, vec!["walk:start"]);
    assert_eq!(previous.steps_left, 4);

    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert_eq!(tree.agent().events[0], "walk:start");
    assert_eq!(tree.into_agent().events.len(), 5);
    Ok(())
}

#[test]
fn test_reset() -> anyhow::Result<()> {
    let root = Sequence::new(vec![walk(), attack()]).into_node();
    let mut tree = BehaviorTree::new(root, Guard::walking(5));
    assert_eq!(tree.run()?, Outcome::Running);
    tree.reset();
    assert!(tree.context().is_empty());
    assert_eq!(tree.run()?, Outcome::Running);
    assert_eq!(tree.agent().events, vec!["walk:start", "walk:start"]);
    Ok(())
}

#[test]
fn test_tick_error() -> anyhow::Result<()> {
    let broken = Task::new("broken", |_: &mut Control, _: &mut Guard| {}).into_node();
    let root = Sequence::new(vec![walk(), broken]).into_node();
    let mut tree = BehaviorTree::new(root, Guard::walking(0));

    let err = tree.run().unwrap_err();
    assert!(matches!(err, TickError::InvalidOutcome { calls: 0, .. }));
    assert!(err.to_string().contains("broken"));
    // The Sequence is left started.
    assert!(!tree.context().is_empty());
    tree.reset();
    assert!(tree.context().is_empty());
    Ok(())
}

#[test]
fn test_registry() -> anyhow::Result<()> {
    let mut registry = Registry::default();
    registry.register("walk", walk());
    registry.register("attack", attack());
    registry.register("spot", spot());
    registry.register(
        "hunt",
        Sequence::resolve(&registry, ["spot", "attack"])?.into_node(),
    );
    registry.register(
        "patrol",
        Priority::new(vec![
            registry.resolve("hunt")?,
            Decorator::resolve(&registry, DecoratorKind::AlwaysSucceed, "walk")?.into_node(),
        ])
        .into_node(),
    );
    assert_eq!(registry.len(), 5);

    let mut tree = BehaviorTree::from_registry(&registry, "patrol", Guard::walking(1))?;
    assert_eq!(tree.run()?, Outcome::Running);
    tree.agent_mut().enemy_visible = true;
    // Priority resumes the running walk instead of re-checking spot.
    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert!(!tree.agent().events.iter().any(|event| event == "attack"));

    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert!(tree.agent().events.iter().any(|event| event == "attack"));

    assert!(matches!(
        BehaviorTree::from_registry(&registry, "sleep", Guard::default()),
        Err(LoadError::UnknownNodeName(name)) if name == "sleep"
    ));
    assert!(matches!(
        Sequence::resolve(&registry, ["walk", "sleep"]),
        Err(LoadError::UnknownNodeName(_))
    ));
    Ok(())
}

#[test]
fn test_load_definitions() -> anyhow::Result<()> {
    let mut registry = Registry::default();
    registry.register("walk", walk());
    registry.register("attack", attack());
    registry.register("spot", spot());

    let names = load_str(
        r#"
# Attack on sight, otherwise keep walking.
tree main = Fallback {
    hunt
    ForceSuccess { walk }
}

tree hunt = Sequence {
    spot
    attack
}
"#,
        &mut registry,
    )?;
    assert_eq!(names, vec!["main", "hunt"]);

    let mut tree = BehaviorTree::from_registry(&registry, "main", Guard::walking(0))?;
    assert_eq!(tree.run()?, Outcome::Succeeded);
    tree.agent_mut().enemy_visible = true;
    assert_eq!(tree.run()?, Outcome::Succeeded);
    assert_eq!(tree.agent().events.last().map(String::as_str), Some("attack:finish"));
    Ok(())
}
