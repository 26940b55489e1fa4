//! Syntax tree produced by [`crate::parser`].
//!
//! The parser accepts more of the `{{ }}` grammar than the canonical form can
//! express; everything it can produce is listed here so the canonicalizer can
//! match on it exhaustively. Positions are byte offsets into the source.

pub type Pos = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub root: ListNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(TextNode),
    Comment(CommentNode),
    Action(ActionNode),
    If(BranchNode),
    Range(BranchNode),
    With(BranchNode),
    Template(TemplateNode),
    Break(Pos),
    Continue(Pos),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub pos: Pos,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub pos: Pos,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub pos: Pos,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub pos: Pos,
    pub pipe: PipeNode,
}

/// `if`, `range` and `with` share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub pos: Pos,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

/// `{{template "name" pipeline}}`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub pos: Pos,
    pub name: String,
    pub pipe: Option<PipeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeNode {
    pub pos: Pos,
    /// `$x = ...` rather than `$x := ...`.
    pub is_assign: bool,
    pub decl: Vec<VariableNode>,
    pub cmds: Vec<CommandNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    pub pos: Pos,
    pub args: Vec<Operand>,
}

/// `$x.a.b`; `ident[0]` keeps the `$` sigil.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    pub pos: Pos,
    pub ident: Vec<String>,
}

/// `.a.b`, stored without dots.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub pos: Pos,
    pub ident: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(FieldNode),
    Variable(VariableNode),
    Dot(Pos),
    Nil(Pos),
    Bool { pos: Pos, value: bool },
    /// Numeric literal exactly as written.
    Number { pos: Pos, text: String },
    /// `quoted` is the literal including quotes, `text` the unescaped value.
    String { pos: Pos, quoted: String, text: String },
    /// Bare identifier, i.e. a function name.
    Identifier { pos: Pos, name: String },
    /// Parenthesized pipeline.
    Pipe(PipeNode),
}

impl Node {
    /// Name the reference engine uses for this node type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Text(_) => "TextNode",
            Node::Comment(_) => "CommentNode",
            Node::Action(_) => "ActionNode",
            Node::If(_) => "IfNode",
            Node::Range(_) => "RangeNode",
            Node::With(_) => "WithNode",
            Node::Template(_) => "TemplateNode",
            Node::Break(_) => "BreakNode",
            Node::Continue(_) => "ContinueNode",
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Node::Text(n) => n.pos,
            Node::Comment(n) => n.pos,
            Node::Action(n) => n.pos,
            Node::If(n) | Node::Range(n) | Node::With(n) => n.pos,
            Node::Template(n) => n.pos,
            Node::Break(pos) | Node::Continue(pos) => *pos,
        }
    }
}

impl Operand {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Field(_) => "FieldNode",
            Operand::Variable(_) => "VariableNode",
            Operand::Dot(_) => "DotNode",
            Operand::Nil(_) => "NilNode",
            Operand::Bool { .. } => "BoolNode",
            Operand::Number { .. } => "NumberNode",
            Operand::String { .. } => "StringNode",
            Operand::Identifier { .. } => "IdentifierNode",
            Operand::Pipe(_) => "PipeNode",
        }
    }
}
