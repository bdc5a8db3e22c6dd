use super::{
    loader::load,
    nom_parser::{TreeDef, TreeRootDef, TreeSource},
};
use crate::{error::LoadError, Registry};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlSource {
    behavior_tree: BTreeMap<String, TreeDef>,
}

/// Parses the YAML definition format into the same AST as [`super::parse_file`].
///
/// ```yaml
/// behavior_tree:
///   main:
///     type: Sequence
///     children:
///     - type: attack
/// ```
///
/// Trees come out sorted by name, since a YAML mapping has no order to keep.
pub fn parse_yaml(yaml: &str) -> Result<TreeSource, LoadError> {
    let source: YamlSource = serde_yaml::from_str(yaml)?;
    Ok(TreeSource {
        tree_defs: source
            .behavior_tree
            .into_iter()
            .map(|(name, root)| TreeRootDef { name, root })
            .collect(),
    })
}

/// Parses YAML definitions and loads them into `registry`, like [`load`].
pub fn load_yaml<A: 'static>(
    yaml: &str,
    registry: &mut Registry<A>,
) -> Result<Vec<String>, LoadError> {
    load(&parse_yaml(yaml)?, registry)
}
