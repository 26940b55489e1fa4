use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Token, Tokenizer};
use std::collections::VecDeque;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub left_delim: String,
    pub right_delim: String,
    /// Keep `{{/* */}}` comments as `CommentNode`s instead of dropping them.
    pub keep_comments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            left_delim: "{{".to_string(),
            right_delim: "}}".to_string(),
            keep_comments: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty strings select the default delimiters.
    pub fn with_delims(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        let (left, right) = (left.into(), right.into());
        if !left.is_empty() {
            self.left_delim = left;
        }
        if !right.is_empty() {
            self.right_delim = right;
        }
        self
    }

    pub fn with_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }
}

/// Parse `source` with the default options.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    Parser::new(source).parse()
}

/// How a list ended.
enum ListEnd {
    Eof,
    End(Pos),
    /// `{{else` was consumed; the rest of the action is left to the caller.
    Else(Pos),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    Range,
    With,
}

impl Control {
    fn keyword(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::Range => "range",
            Control::With => "with",
        }
    }
}

pub struct Parser<'a> {
    lexer: Tokenizer<'a>,
    buffer: VecDeque<(Pos, Token)>,
    keep_comments: bool,
    range_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Tokenizer::new(input),
            buffer: VecDeque::new(),
            keep_comments: false,
            range_depth: 0,
        }
    }

    pub fn with_options(input: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            lexer: Tokenizer::with_delims(input, &options.left_delim, &options.right_delim),
            keep_comments: options.keep_comments,
            ..Self::new(input)
        }
    }

    fn peek(&mut self, n: usize) -> Result<Option<Token>, ParseError> {
        while self.buffer.len() <= n {
            match self.lexer.next_token()? {
                Some(token) => self.buffer.push_back(token),
                None => return Ok(None),
            }
        }
        Ok(self.buffer.get(n).map(|(_, t)| t.clone()))
    }

    fn consume(&mut self) -> Result<Option<(Pos, Token)>, ParseError> {
        match self.buffer.pop_front() {
            Some(token) => Ok(Some(token)),
            None => self.lexer.next_token(),
        }
    }

    /// Position of the next token, or the end of input.
    fn next_pos(&mut self) -> Result<Pos, ParseError> {
        self.peek(0)?;
        Ok(self
            .buffer
            .front()
            .map_or_else(|| self.lexer.position(), |(pos, _)| *pos))
    }

    fn expect_right_delim(&mut self, context: &str) -> Result<(), ParseError> {
        match self.consume()? {
            Some((_, Token::RightDelim)) => Ok(()),
            Some((pos, t)) => Err(ParseError::new(
                format!("unexpected {t:?} in {context}"),
                pos,
            )),
            None => Err(ParseError::new(
                format!("unclosed {context}"),
                self.lexer.position(),
            )),
        }
    }

    pub fn parse(mut self) -> Result<Tree, ParseError> {
        let (root, end) = self.parse_list()?;
        match end {
            ListEnd::Eof => Ok(Tree { root }),
            ListEnd::End(pos) => Err(ParseError::new("unexpected {{end}}", pos)),
            ListEnd::Else(pos) => Err(ParseError::new("unexpected {{else}}", pos)),
        }
    }

    fn parse_list(&mut self) -> Result<(ListNode, ListEnd), ParseError> {
        let pos = self.next_pos()?;
        let mut nodes = Vec::new();
        loop {
            let Some((pos_tok, token)) = self.consume()? else {
                return Ok((ListNode { pos, nodes }, ListEnd::Eof));
            };
            match token {
                Token::Text(text) => nodes.push(Node::Text(TextNode { pos: pos_tok, text })),
                Token::Comment(text) => {
                    if self.keep_comments {
                        nodes.push(Node::Comment(CommentNode { pos: pos_tok, text }));
                    }
                }
                Token::LeftDelim => match self.peek(0)? {
                    Some(Token::End) => {
                        self.consume()?;
                        self.expect_right_delim("end")?;
                        return Ok((ListNode { pos, nodes }, ListEnd::End(pos_tok)));
                    }
                    Some(Token::Else) => {
                        self.consume()?;
                        return Ok((ListNode { pos, nodes }, ListEnd::Else(pos_tok)));
                    }
                    Some(Token::If) => {
                        self.consume()?;
                        nodes.push(Node::If(self.parse_control(pos_tok, Control::If)?));
                    }
                    Some(Token::Range) => {
                        self.consume()?;
                        self.range_depth += 1;
                        let branch = self.parse_control(pos_tok, Control::Range);
                        self.range_depth -= 1;
                        nodes.push(Node::Range(branch?));
                    }
                    Some(Token::With) => {
                        self.consume()?;
                        nodes.push(Node::With(self.parse_control(pos_tok, Control::With)?));
                    }
                    Some(Token::Template) => {
                        self.consume()?;
                        nodes.push(Node::Template(self.parse_template(pos_tok)?));
                    }
                    Some(Token::Break) => {
                        self.consume()?;
                        self.parse_loop_control(pos_tok, "break")?;
                        nodes.push(Node::Break(pos_tok));
                    }
                    Some(Token::Continue) => {
                        self.consume()?;
                        self.parse_loop_control(pos_tok, "continue")?;
                        nodes.push(Node::Continue(pos_tok));
                    }
                    Some(Token::Define) | Some(Token::Block) => {
                        return Err(ParseError::new(
                            "template definitions are not supported",
                            pos_tok,
                        ));
                    }
                    _ => {
                        let pipe = self.parse_pipeline(pos_tok, "command", Token::RightDelim)?;
                        nodes.push(Node::Action(ActionNode { pos: pos_tok, pipe }));
                    }
                },
                t => {
                    return Err(ParseError::new(
                        format!("unexpected {t:?} outside action"),
                        pos_tok,
                    ))
                }
            }
        }
    }

    /// Parses the rest of `{{if ...}}`, `{{range ...}}` or `{{with ...}}`
    /// through its `{{end}}`.
    fn parse_control(&mut self, pos: Pos, control: Control) -> Result<BranchNode, ParseError> {
        let pipe = self.parse_pipeline(pos, control.keyword(), Token::RightDelim)?;
        let (list, end) = self.parse_list()?;

        let else_list = match end {
            ListEnd::End(_) => None,
            ListEnd::Eof => {
                return Err(ParseError::new(
                    format!("unexpected EOF: missing {{{{end}}}} for {{{{{}}}}}", control.keyword()),
                    pos,
                ))
            }
            ListEnd::Else(else_pos) => match (control, self.peek(0)?) {
                // `{{else if}}` nests a branch that shares our `{{end}}`.
                (Control::If, Some(Token::If)) | (Control::With, Some(Token::With)) => {
                    self.consume()?;
                    let inner = self.parse_control(else_pos, control)?;
                    let node = match control {
                        Control::With => Node::With(inner),
                        _ => Node::If(inner),
                    };
                    Some(ListNode {
                        pos: else_pos,
                        nodes: vec![node],
                    })
                }
                _ => {
                    self.expect_right_delim("else")?;
                    let (else_list, end) = self.parse_list()?;
                    match end {
                        ListEnd::End(_) => Some(else_list),
                        ListEnd::Else(p) => {
                            return Err(ParseError::new("expected {{end}}; found {{else}}", p))
                        }
                        ListEnd::Eof => {
                            return Err(ParseError::new(
                                format!(
                                    "unexpected EOF: missing {{{{end}}}} for {{{{{}}}}}",
                                    control.keyword()
                                ),
                                pos,
                            ))
                        }
                    }
                }
            },
        };

        Ok(BranchNode {
            pos,
            pipe,
            list,
            else_list,
        })
    }

    fn parse_template(&mut self, pos: Pos) -> Result<TemplateNode, ParseError> {
        let name = match self.consume()? {
            Some((_, Token::StringLit { text, .. })) => text,
            Some((p, t)) => {
                return Err(ParseError::new(
                    format!("expected template name, got {t:?}"),
                    p,
                ))
            }
            None => return Err(ParseError::new("unclosed template", pos)),
        };
        let pipe = if self.peek(0)? == Some(Token::RightDelim) {
            self.consume()?;
            None
        } else {
            Some(self.parse_pipeline(pos, "template", Token::RightDelim)?)
        };
        Ok(TemplateNode { pos, name, pipe })
    }

    fn parse_loop_control(&mut self, pos: Pos, keyword: &str) -> Result<(), ParseError> {
        if self.range_depth == 0 {
            return Err(ParseError::new(
                format!("{{{{{keyword}}}}} outside {{{{range}}}}"),
                pos,
            ));
        }
        self.expect_right_delim(keyword)
    }

    /// Parses `[decl :=] cmd | cmd ...` and consumes `close`.
    fn parse_pipeline(
        &mut self,
        pos: Pos,
        context: &str,
        close: Token,
    ) -> Result<PipeNode, ParseError> {
        let mut decl = Vec::new();
        let mut is_assign = false;

        if let Some(Token::Variable(_)) = self.peek(0)? {
            match self.peek(1)? {
                Some(Token::Declare) | Some(Token::Assign) => {
                    decl.push(self.take_declared(context)?);
                    is_assign = self.take_declare_op(context)?;
                }
                Some(Token::Comma) if context == "range" => {
                    decl.push(self.take_declared(context)?);
                    self.consume()?; // ,
                    decl.push(self.take_declared(context)?);
                    is_assign = self.take_declare_op(context)?;
                }
                _ => {}
            }
        }

        let mut cmds = Vec::new();
        loop {
            cmds.push(self.parse_command(context, &close)?);
            match self.consume()? {
                Some((_, Token::Pipe)) => continue,
                Some((_, t)) if t == close => break,
                Some((p, t)) => {
                    return Err(ParseError::new(
                        format!("unexpected {t:?} in {context}"),
                        p,
                    ))
                }
                None => return Err(ParseError::new("unclosed action", pos)),
            }
        }

        Ok(PipeNode {
            pos,
            is_assign,
            decl,
            cmds,
        })
    }

    fn take_declared(&mut self, context: &str) -> Result<VariableNode, ParseError> {
        match self.consume()? {
            Some((pos, Token::Variable(ident))) if ident.len() == 1 => {
                Ok(VariableNode { pos, ident })
            }
            Some((pos, Token::Variable(ident))) => Err(ParseError::new(
                format!("illegal variable in declaration: {}", ident.join(".")),
                pos,
            )),
            Some((pos, t)) => Err(ParseError::new(
                format!("expected variable in {context}, got {t:?}"),
                pos,
            )),
            None => Err(ParseError::new(
                format!("unclosed {context}"),
                self.lexer.position(),
            )),
        }
    }

    /// `:=` declares, `=` assigns.
    fn take_declare_op(&mut self, context: &str) -> Result<bool, ParseError> {
        match self.consume()? {
            Some((_, Token::Declare)) => Ok(false),
            Some((_, Token::Assign)) => Ok(true),
            Some((pos, t)) => Err(ParseError::new(
                format!("expected := or = in {context}, got {t:?}"),
                pos,
            )),
            None => Err(ParseError::new(
                format!("unclosed {context}"),
                self.lexer.position(),
            )),
        }
    }

    fn parse_command(&mut self, context: &str, close: &Token) -> Result<CommandNode, ParseError> {
        let pos = self.next_pos()?;
        let mut args = Vec::new();
        loop {
            match self.peek(0)? {
                Some(Token::Pipe) => break,
                Some(t) if t == *close => break,
                None => return Err(ParseError::new("unclosed action", pos)),
                Some(_) => args.push(self.parse_operand()?),
            }
        }
        if args.is_empty() {
            return Err(ParseError::new(format!("missing value for {context}"), pos));
        }
        Ok(CommandNode { pos, args })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        let Some((pos, token)) = self.consume()? else {
            return Err(ParseError::new("unclosed action", self.lexer.position()));
        };
        let operand = match token {
            Token::Field(ident) => Operand::Field(FieldNode { pos, ident }),
            Token::Variable(ident) => Operand::Variable(VariableNode { pos, ident }),
            Token::Dot => Operand::Dot(pos),
            Token::Nil => Operand::Nil(pos),
            Token::Bool(value) => Operand::Bool { pos, value },
            Token::Number(text) => Operand::Number { pos, text },
            Token::StringLit { quoted, text } => Operand::String { pos, quoted, text },
            Token::Ident(name) => Operand::Identifier { pos, name },
            Token::LParen => Operand::Pipe(self.parse_pipeline(
                pos,
                "parenthesized pipeline",
                Token::RParen,
            )?),
            t => {
                return Err(ParseError::new(
                    format!("unexpected {t:?} in operand"),
                    pos,
                ))
            }
        };
        Ok(operand)
    }
}
