//! Canonical, runtime-neutral template tree.
//!
//! This is the wire contract between renderers: every type here serializes to
//! a JSON object whose `type` field names the node kind and whose remaining
//! field names (`content`, `items`, `pipe`, `isAssign`, `decl`, `cmds`,
//! `args`, `ident`, `list`, `else`) never change. Trees carry no source
//! positions and are immutable once built, so one tree can be rendered from
//! many threads at once.

use serde::{Deserialize, Serialize};

/// A node that can appear in a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "TextNode")]
    Text { content: String },

    #[serde(rename = "ListNode")]
    List { items: Vec<Node> },

    #[serde(rename = "ActionNode")]
    Action { pipe: Pipe },

    #[serde(rename = "IfNode")]
    If(Branch),

    #[serde(rename = "RangeNode")]
    Range(Branch),
}

/// Ordered block of nodes used as a branch body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ListNode", from = "wire::List")]
pub struct List {
    pub items: Vec<Node>,
}

/// Shared shape of `if` and `range`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub pipe: Pipe,
    pub list: List,
    /// `None` means there is no else clause at all.
    #[serde(rename = "else", default)]
    pub else_list: Option<List>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "PipeNode", from = "wire::Pipe")]
pub struct Pipe {
    /// Declared variables are assigned (`=`) rather than declared (`:=`).
    #[serde(rename = "isAssign")]
    pub is_assign: bool,
    pub decl: Vec<Variable>,
    pub cmds: Vec<Command>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "CommandNode", from = "wire::Command")]
pub struct Command {
    pub args: Vec<Arg>,
}

/// Operand of a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Arg {
    /// Dotted lookup on the dot; an empty path is the dot itself.
    #[serde(rename = "FieldNode")]
    Field { ident: Vec<String> },

    /// Variable name followed by a lookup chain.
    #[serde(rename = "VariableNode")]
    Variable { ident: Vec<String> },
}

/// Variable named by a pipe declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "VariableNode", from = "wire::Variable")]
pub struct Variable {
    pub ident: Vec<String>,
}

/// Single-variant tagged shapes the typed structs deserialize through, so a
/// missing or wrong `type` is rejected instead of ignored.
mod wire {
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(tag = "type")]
    pub enum List {
        ListNode { items: Vec<super::Node> },
    }

    #[derive(Deserialize)]
    #[serde(tag = "type")]
    pub enum Pipe {
        PipeNode {
            #[serde(rename = "isAssign")]
            is_assign: bool,
            decl: Vec<super::Variable>,
            cmds: Vec<super::Command>,
        },
    }

    #[derive(Deserialize)]
    #[serde(tag = "type")]
    pub enum Command {
        CommandNode { args: Vec<super::Arg> },
    }

    #[derive(Deserialize)]
    #[serde(tag = "type")]
    pub enum Variable {
        VariableNode { ident: Vec<String> },
    }
}

impl From<wire::List> for List {
    fn from(wire: wire::List) -> Self {
        let wire::List::ListNode { items } = wire;
        Self { items }
    }
}

impl From<wire::Pipe> for Pipe {
    fn from(wire: wire::Pipe) -> Self {
        let wire::Pipe::PipeNode {
            is_assign,
            decl,
            cmds,
        } = wire;
        Self {
            is_assign,
            decl,
            cmds,
        }
    }
}

impl From<wire::Command> for Command {
    fn from(wire: wire::Command) -> Self {
        let wire::Command::CommandNode { args } = wire;
        Self { args }
    }
}

impl From<wire::Variable> for Variable {
    fn from(wire: wire::Variable) -> Self {
        let wire::Variable::VariableNode { ident } = wire;
        Self { ident }
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text {
            content: content.into(),
        }
    }

    /// `{{.a.b}}` style action printing a field.
    pub fn field_action<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Node::Action {
            pipe: Pipe::single(Arg::field(path)),
        }
    }
}

impl From<List> for Node {
    fn from(list: List) -> Self {
        Node::List { items: list.items }
    }
}

impl List {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }
}

impl Pipe {
    /// Non-declaring pipe with one command.
    pub fn single(arg: Arg) -> Self {
        Self {
            is_assign: false,
            decl: Vec::new(),
            cmds: vec![Command { args: vec![arg] }],
        }
    }

    /// Pipe with a single command whose result is declared as `names`.
    pub fn declaring<S: Into<String>>(names: impl IntoIterator<Item = S>, arg: Arg) -> Self {
        Self {
            decl: names
                .into_iter()
                .map(|n| Variable {
                    ident: vec![n.into()],
                })
                .collect(),
            ..Self::single(arg)
        }
    }
}

impl Arg {
    pub fn field<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Arg::Field {
            ident: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn variable<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Arg::Variable {
            ident: path.into_iter().map(Into::into).collect(),
        }
    }
}
