use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace1},
    combinator::{cut, map, opt, recognize, value},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// An argument of a node in a definition, e.g. `n = 3` or `weights = [1, 2]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Number(f64),
    List(Vec<f64>),
}

/// A node in a tree definition, before its names are resolved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeDef {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub args: BTreeMap<String, ArgValue>,
    #[serde(default)]
    pub children: Vec<TreeDef>,
}

impl TreeDef {
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            args: BTreeMap::new(),
            children: vec![],
        }
    }

    pub fn with_children(ty: impl Into<String>, children: Vec<TreeDef>) -> Self {
        Self {
            children,
            ..Self::new(ty)
        }
    }
}

/// A named tree, `tree name = ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRootDef {
    pub name: String,
    pub root: TreeDef,
}

/// The AST of a whole definition file. It can be loaded into as many
/// registries as you like.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeSource {
    pub tree_defs: Vec<TreeRootDef>,
}

impl TreeSource {
    pub fn find(&self, name: &str) -> Option<&TreeRootDef> {
        self.tree_defs.iter().find(|tree| tree.name == name)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn line_comment(i: &str) -> IResult<&str, ()> {
    value((), pair(char('#'), opt(is_not("\n\r"))))(i)
}

/// Skips whitespace, newlines and comments.
fn ws(i: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), line_comment))))(i)
}

fn arg_value(i: &str) -> IResult<&str, ArgValue> {
    alt((
        map(double, ArgValue::Number),
        map(
            delimited(
                char('['),
                separated_list0(preceded(ws, char(',')), preceded(ws, double)),
                preceded(ws, char(']')),
            ),
            ArgValue::List,
        ),
    ))(i)
}

fn arg(i: &str) -> IResult<&str, (&str, ArgValue)> {
    separated_pair(
        preceded(ws, identifier),
        delimited(ws, char('='), ws),
        arg_value,
    )(i)
}

// Once an opening paren or brace is seen, a missing closing one is a hard
// failure instead of a node without arguments or children.
fn args(i: &str) -> IResult<&str, Vec<(&str, ArgValue)>> {
    preceded(
        char('('),
        cut(terminated(
            separated_list0(preceded(ws, char(',')), arg),
            preceded(ws, char(')')),
        )),
    )(i)
}

fn tree_children(i: &str) -> IResult<&str, Vec<TreeDef>> {
    preceded(
        char('{'),
        cut(terminated(many0(parse_tree_node), preceded(ws, char('}')))),
    )(i)
}

/// A node: `!node`, or a name with optional arguments and children.
pub fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, _) = ws(i)?;

    let (i, excl) = opt(char('!'))(i)?;
    if excl.is_some() {
        let (i, inner) = parse_tree_node(i)?;
        return Ok((i, TreeDef::with_children("Invert", vec![inner])));
    }

    let (i, ty) = identifier(i)?;
    let (i, node_args) = opt(preceded(ws, args))(i)?;
    let (i, children) = opt(preceded(ws, tree_children))(i)?;

    Ok((
        i,
        TreeDef {
            ty: ty.to_owned(),
            args: node_args
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
            children: children.unwrap_or_default(),
        },
    ))
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = ws(i)?;
    let (i, _) = pair(tag("tree"), multispace1)(i)?;
    let (i, name) = identifier(i)?;
    let (i, _) = delimited(ws, char('='), ws)(i)?;
    let (i, root) = parse_tree_node(i)?;

    Ok((
        i,
        TreeRootDef {
            name: name.to_owned(),
            root,
        },
    ))
}

/// Parses a definition file. Parsing stops at the first statement that does
/// not start with `tree`, which is left in the remaining input. An unclosed
/// brace or paren is an error.
pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, tree_defs) = many0(parse_tree)(i)?;

    // Eat up trailing comments and newlines to indicate that the input was thoroughly consumed
    let (i, _) = ws(i)?;

    Ok((i, TreeSource { tree_defs }))
}
