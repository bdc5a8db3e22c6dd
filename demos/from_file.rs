use agent_behavior_tree::{load_str, load_yaml, BehaviorTree, Control, Registry, Task};
use std::{env, fs};

#[derive(Debug, Default)]
struct Body {
    hp: i32,
    log: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::default();
    registry.register(
        "is_hurt",
        Task::condition("is_hurt", |body: &mut Body| body.hp < 50).into_node(),
    );
    registry.register(
        "heal",
        Task::new("heal", |ctl: &mut Control, body: &mut Body| {
            body.hp += 20;
            body.log.push(format!("heal -> {}", body.hp));
            if body.hp < 50 {
                ctl.running();
            } else {
                ctl.succeed();
            }
        })
        .into_node(),
    );
    registry.register(
        "fight",
        Task::new("fight", |ctl: &mut Control, body: &mut Body| {
            body.hp -= 30;
            body.log.push(format!("fight -> {}", body.hp));
            ctl.succeed();
        })
        .into_node(),
    );

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/body.txt".to_owned());
    let source = fs::read_to_string(&path)?;
    let trees = if path.ends_with(".yaml") || path.ends_with(".yml") {
        load_yaml(&source, &mut registry)?
    } else {
        load_str(&source, &mut registry)?
    };
    println!("loaded trees: {:?}", trees);

    let mut tree = BehaviorTree::from_registry(
        &registry,
        "main",
        Body {
            hp: 100,
            ..Body::default()
        },
    )?;
    for _ in 0..8 {
        let result = tree.run()?;
        eprintln!("result: {:?}", result);
    }
    println!("{:#?}", tree.agent());

    Ok(())
}
