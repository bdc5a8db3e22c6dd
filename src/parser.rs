mod loader;
mod nom_parser;
mod yaml_parser;

pub use self::{
    loader::{load, load_str},
    nom_parser::{parse_file, parse_tree_node, ArgValue, TreeDef, TreeRootDef, TreeSource},
    yaml_parser::{load_yaml, parse_yaml},
};
