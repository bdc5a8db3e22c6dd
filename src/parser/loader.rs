use std::collections::{HashMap, HashSet};

use super::nom_parser::{parse_file, ArgValue, TreeDef, TreeSource};
use crate::{
    error::LoadError, Decorator, DecoratorKind, Node, Priority, Random, Registry, Repeat, Retry,
    Sequence,
};
use tracing::debug;

/// Instantiate every tree of a definition AST and register each of them in
/// `registry` under its tree name.
///
/// Names in the definitions refer, in this order, to a built-in node type, to
/// another tree of the same source, or to a node already in the registry.
/// Every name is resolved here; nothing is looked up while ticking. A tree
/// used as a subtree in several places is built once and shared.
///
/// Returns the names of the loaded trees in source order.
pub fn load<A: 'static>(
    tree_source: &TreeSource,
    registry: &mut Registry<A>,
) -> Result<Vec<String>, LoadError> {
    let mut seen = HashSet::new();
    for tree in &tree_source.tree_defs {
        if is_builtin(&tree.name) {
            return Err(LoadError::ReservedTreeName(tree.name.clone()));
        }
        if !seen.insert(tree.name.as_str()) {
            return Err(LoadError::DuplicateTree(tree.name.clone()));
        }
    }

    let mut loader = Loader {
        tree_source,
        registry,
        loaded: HashMap::new(),
    };
    for tree in &tree_source.tree_defs {
        loader.load_tree(&tree.name, None)?;
    }
    let mut loaded = loader.loaded;

    let names: Vec<String> = tree_source
        .tree_defs
        .iter()
        .map(|tree| tree.name.clone())
        .collect();
    for name in &names {
        if let Some(node) = loaded.remove(name) {
            registry.register(name, node);
        }
    }
    debug!(trees = ?names, "loaded tree definitions");

    Ok(names)
}

/// Parses a definition file and loads it into `registry`, like [`load`].
/// Input that is not a tree definition is a parse error.
pub fn load_str<A: 'static>(
    source: &str,
    registry: &mut Registry<A>,
) -> Result<Vec<String>, LoadError> {
    let (rest, tree_source) = parse_file(source).map_err(|err| LoadError::Parse(err.to_string()))?;
    if !rest.is_empty() {
        let line = rest.lines().next().unwrap_or(rest);
        return Err(LoadError::Parse(format!("unexpected input {:?}", line)));
    }
    load(&tree_source, registry)
}

/// A mechanism to detect infinite recursion. It is a linked list in call stack.
/// You can traverse the link back to enumerate all the subtree names that are
/// being built and check if a subtree name to be inserted is already there.
///
/// A tree that contains itself would need an infinitely large node graph,
/// since every name is resolved to a node at load time, so it is an error.
struct TreeStack<'a> {
    name: &'a str,
    parent: Option<&'a TreeStack<'a>>,
}

impl<'a> TreeStack<'a> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

struct Loader<'a, A> {
    tree_source: &'a TreeSource,
    registry: &'a Registry<A>,
    loaded: HashMap<String, Node<A>>,
}

impl<'a, A: 'static> Loader<'a, A> {
    fn load_tree(&mut self, name: &str, parent: Option<&TreeStack>) -> Result<Node<A>, LoadError> {
        if let Some(node) = self.loaded.get(name) {
            return Ok(node.clone());
        }

        // Prevent infinite recursion
        if parent.map_or(false, |parent| parent.find(name)) {
            return Err(LoadError::InfiniteRecursion {
                node: name.to_owned(),
            });
        }

        let tree_source = self.tree_source;
        let tree = tree_source
            .find(name)
            .ok_or_else(|| LoadError::UnknownNodeName(name.to_owned()))?;
        let stack = TreeStack { name, parent };
        let node = self.build(&tree.root, &stack)?;
        self.loaded.insert(name.to_owned(), node.clone());
        Ok(node)
    }

    fn build(&mut self, def: &TreeDef, stack: &TreeStack) -> Result<Node<A>, LoadError> {
        if let Some(kind) = decorator_kind(&def.ty) {
            expect_args(def, &[])?;
            return Ok(Decorator::new(kind, self.single_child(def, stack)?).into_node());
        }

        Ok(match def.ty.as_str() {
            "Sequence" => {
                expect_args(def, &[])?;
                Sequence::new(self.build_children(def, stack)?).into_node()
            }
            "Priority" | "Selector" | "Fallback" => {
                expect_args(def, &[])?;
                Priority::new(self.build_children(def, stack)?).into_node()
            }
            "Random" => {
                expect_args(def, &["weights"])?;
                let children = self.build_children(def, stack)?;
                match def.args.get("weights") {
                    None => Random::new(children).into_node(),
                    Some(ArgValue::List(weights)) if weights.len() == children.len() => {
                        Random::weighted(children.into_iter().zip(weights.iter().copied()))?
                            .into_node()
                    }
                    Some(_) => {
                        return Err(LoadError::InvalidWeights {
                            node: def.ty.clone(),
                            reason: format!("expected a list of {} weights", children.len()),
                        })
                    }
                }
            }
            "Repeat" => {
                expect_args(def, &["n"])?;
                let times = count_arg(def, "n")?;
                Repeat::new(times, self.single_child(def, stack)?).into_node()
            }
            "Retry" => {
                expect_args(def, &["n"])?;
                let attempts = count_arg(def, "n")?;
                Retry::new(attempts, self.single_child(def, stack)?).into_node()
            }
            name => {
                if !def.children.is_empty() {
                    return Err(LoadError::UnexpectedChildren {
                        node: name.to_owned(),
                    });
                }
                expect_args(def, &[])?;
                if self.tree_source.find(name).is_some() {
                    self.load_tree(name, Some(stack))?
                } else {
                    self.registry.resolve(name)?
                }
            }
        })
    }

    fn build_children(&mut self, def: &TreeDef, stack: &TreeStack) -> Result<Vec<Node<A>>, LoadError> {
        def.children
            .iter()
            .map(|child| self.build(child, stack))
            .collect()
    }

    fn single_child(&mut self, def: &TreeDef, stack: &TreeStack) -> Result<Node<A>, LoadError> {
        match def.children.as_slice() {
            [] => Err(LoadError::MissingChild {
                node: def.ty.clone(),
            }),
            [child] => self.build(child, stack),
            _ => Err(LoadError::TooManyChildren {
                node: def.ty.clone(),
            }),
        }
    }
}

fn decorator_kind(ty: &str) -> Option<DecoratorKind> {
    Some(match ty {
        "Transparent" => DecoratorKind::Transparent,
        "Invert" | "Inverter" => DecoratorKind::Invert,
        "AlwaysSucceed" | "ForceSuccess" => DecoratorKind::AlwaysSucceed,
        "AlwaysFail" | "ForceFailure" => DecoratorKind::AlwaysFail,
        _ => return None,
    })
}

fn is_builtin(name: &str) -> bool {
    decorator_kind(name).is_some()
        || matches!(
            name,
            "Sequence" | "Priority" | "Selector" | "Fallback" | "Random" | "Repeat" | "Retry"
        )
}

fn expect_args(def: &TreeDef, allowed: &[&str]) -> Result<(), LoadError> {
    match def.args.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(arg) => Err(LoadError::UnexpectedArgument {
            node: def.ty.clone(),
            arg: arg.clone(),
        }),
        None => Ok(()),
    }
}

fn count_arg(def: &TreeDef, arg: &str) -> Result<usize, LoadError> {
    match def.args.get(arg) {
        None => Err(LoadError::MissingArgument {
            node: def.ty.clone(),
            arg: arg.to_owned(),
        }),
        Some(ArgValue::Number(n)) if *n >= 0. && n.fract() == 0. && *n <= u32::MAX as f64 => {
            Ok(*n as usize)
        }
        Some(_) => Err(LoadError::InvalidArgument {
            node: def.ty.clone(),
            arg: arg.to_owned(),
        }),
    }
}
