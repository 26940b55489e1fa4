//! Syntax tree to canonical tree.
//!
//! Every syntax-tree kind is matched explicitly. Kinds the canonical form
//! cannot express fail with [`CanonError::UnsupportedNodeKind`] so a parser
//! that grows new constructs is caught here rather than rendered wrongly.

use crate::ast;
use crate::error::CanonError;
use crate::node::{Arg, Branch, Command, List, Node, Pipe, Variable};

/// Canonical form of a parsed template; the root is always a `ListNode`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn canonicalize(tree: &ast::Tree) -> Result<Node, CanonError> {
    let root = list(&tree.root)?;
    tracing::debug!(items = root.items.len(), "canonicalized template");
    Ok(root.into())
}

fn unsupported(kind: &str) -> CanonError {
    CanonError::UnsupportedNodeKind {
        kind: kind.to_string(),
    }
}

fn list(list: &ast::ListNode) -> Result<List, CanonError> {
    let items = list.nodes.iter().map(node).collect::<Result<_, _>>()?;
    Ok(List::new(items))
}

fn node(node: &ast::Node) -> Result<Node, CanonError> {
    match node {
        ast::Node::Text(text) => Ok(Node::text(&text.text)),
        ast::Node::Action(action) => Ok(Node::Action {
            pipe: pipe(&action.pipe)?,
        }),
        ast::Node::If(b) => Ok(Node::If(branch(b)?)),
        ast::Node::Range(b) => Ok(Node::Range(branch(b)?)),
        ast::Node::Comment(_)
        | ast::Node::With(_)
        | ast::Node::Template(_)
        | ast::Node::Break(_)
        | ast::Node::Continue(_) => Err(unsupported(node.kind_name())),
    }
}

fn branch(b: &ast::BranchNode) -> Result<Branch, CanonError> {
    Ok(Branch {
        pipe: pipe(&b.pipe)?,
        list: list(&b.list)?,
        else_list: b.else_list.as_ref().map(list).transpose()?,
    })
}

fn pipe(p: &ast::PipeNode) -> Result<Pipe, CanonError> {
    let decl = p
        .decl
        .iter()
        .map(|v| Variable {
            ident: variable_ident(&v.ident),
        })
        .collect();
    let cmds = p
        .cmds
        .iter()
        .map(|cmd| {
            let args: Vec<Arg> = cmd.args.iter().map(arg).collect::<Result<_, _>>()?;
            if args.len() != 1 {
                return Err(CanonError::CommandArity { count: args.len() });
            }
            Ok(Command { args })
        })
        .collect::<Result<_, CanonError>>()?;
    Ok(Pipe {
        is_assign: p.is_assign,
        decl,
        cmds,
    })
}

fn arg(op: &ast::Operand) -> Result<Arg, CanonError> {
    match op {
        ast::Operand::Field(f) => Ok(Arg::Field {
            ident: f.ident.clone(),
        }),
        ast::Operand::Variable(v) => Ok(Arg::Variable {
            ident: variable_ident(&v.ident),
        }),
        // `.` is the empty lookup chain.
        ast::Operand::Dot(_) => Ok(Arg::Field { ident: Vec::new() }),
        ast::Operand::Nil(_)
        | ast::Operand::Bool { .. }
        | ast::Operand::Number { .. }
        | ast::Operand::String { .. }
        | ast::Operand::Identifier { .. }
        | ast::Operand::Pipe(_) => Err(unsupported(op.kind_name())),
    }
}

/// Drops the `$` sigil from the name; the root variable `$` keeps it.
fn variable_ident(ident: &[String]) -> Vec<String> {
    let mut out = ident.to_vec();
    if let Some(name) = out.first_mut() {
        if let Some(stripped) = name.strip_prefix('$').filter(|s| !s.is_empty()) {
            *name = stripped.to_string();
        }
    }
    out
}
