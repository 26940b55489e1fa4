use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Comment(String),
    LeftDelim,  // {{
    RightDelim, // }}

    // Keywords
    If,
    Else,
    End,
    Range,
    With,
    Template,
    Define,
    Block,
    Break,
    Continue,
    Nil,
    Bool(bool),

    // Symbols
    Declare, // :=
    Assign,  // =
    Pipe,    // |
    Comma,   // ,
    LParen,  // (
    RParen,  // )
    Dot,     // .

    // Data
    Field(Vec<String>),    // .a.b
    Variable(Vec<String>), // $x.a, first segment keeps the `$`
    Ident(String),
    Number(String),
    StringLit { quoted: String, text: String },
}

#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
    in_action: bool,
    /// Set by a ` -}}` marker; strips leading whitespace from the next text.
    trim_next_text: bool,
    left_delim: &'a str,
    right_delim: &'a str,
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_delims(input, "{{", "}}")
    }

    pub fn with_delims(input: &'a str, left_delim: &'a str, right_delim: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            in_action: false,
            trim_next_text: false,
            left_delim,
            right_delim,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Whether the left delimiter starting at `at` carries a `- ` trim marker.
    fn left_trim_at(&self, at: usize) -> bool {
        let after = &self.input[at + self.left_delim.len()..];
        let mut chars = after.chars();
        chars.next() == Some('-') && chars.next().is_some_and(is_space)
    }

    /// Returns the next token and the byte offset it starts at.
    pub fn next_token(&mut self) -> Result<Option<(usize, Token)>, ParseError> {
        if self.in_action {
            self.next_action_token()
        } else {
            self.next_text_token()
        }
    }

    fn next_text_token(&mut self) -> Result<Option<(usize, Token)>, ParseError> {
        loop {
            let rest = self.remaining();
            if rest.is_empty() {
                return Ok(None);
            }
            let start = self.cursor;

            match rest.find(self.left_delim) {
                Some(0) => return self.lex_left_delim().map(Some),
                found => {
                    let len = found.unwrap_or(rest.len());
                    let mut text = &rest[..len];
                    if std::mem::take(&mut self.trim_next_text) {
                        text = text.trim_start_matches(is_space);
                    }
                    if found.is_some() && self.left_trim_at(start + len) {
                        text = text.trim_end_matches(is_space);
                    }
                    self.advance(len);
                    if !text.is_empty() {
                        return Ok(Some((start, Token::Text(text.to_string()))));
                    }
                }
            }
        }
    }

    fn lex_left_delim(&mut self) -> Result<(usize, Token), ParseError> {
        let start = self.cursor;
        let trim = self.left_trim_at(start);
        self.advance(self.left_delim.len());
        if trim {
            // Skip the `-` only; the whitespace after it is skipped in-action.
            self.advance(1);
            let ws = self.remaining().len() - self.remaining().trim_start_matches(is_space).len();
            if self.remaining()[ws..].starts_with("/*") {
                self.advance(ws);
            }
        }

        // No text since the last ` -}}`, nothing left to trim.
        self.trim_next_text = false;

        if self.remaining().starts_with("/*") {
            return self.lex_comment(start);
        }

        self.in_action = true;
        Ok((start, Token::LeftDelim))
    }

    fn lex_comment(&mut self, start: usize) -> Result<(usize, Token), ParseError> {
        let body = &self.remaining()[2..];
        let Some(close) = body.find("*/") else {
            return Err(ParseError::new("unclosed comment", start));
        };
        let text = body[..close].to_string();
        self.advance(2 + close + 2);

        let rest = self.remaining();
        if rest.starts_with(self.right_delim) {
            self.advance(self.right_delim.len());
        } else {
            let trimmed = rest.trim_start_matches(is_space);
            let ws = rest.len() - trimmed.len();
            if ws > 0
                && trimmed.starts_with('-')
                && trimmed[1..].starts_with(self.right_delim)
            {
                self.advance(ws + 1 + self.right_delim.len());
                self.trim_next_text = true;
            } else {
                return Err(ParseError::new(
                    "comment ends before closing delimiter",
                    self.cursor,
                ));
            }
        }
        Ok((start, Token::Comment(text)))
    }

    fn next_action_token(&mut self) -> Result<Option<(usize, Token)>, ParseError> {
        // In action: skip whitespace
        let rest = self.remaining();
        let rest_trimmed = rest.trim_start_matches(is_space);
        let skipped = rest.len() - rest_trimmed.len();
        self.advance(skipped);

        let start = self.cursor;
        let rest = self.remaining();
        if rest.is_empty() {
            return Err(ParseError::new("unclosed action", start));
        }

        // Check action ends
        if rest.starts_with(self.right_delim) {
            self.advance(self.right_delim.len());
            self.in_action = false;
            return Ok(Some((start, Token::RightDelim)));
        }
        if skipped > 0 && rest.starts_with('-') && rest[1..].starts_with(self.right_delim) {
            self.advance(1 + self.right_delim.len());
            self.in_action = false;
            self.trim_next_text = true;
            return Ok(Some((start, Token::RightDelim)));
        }

        // Symbols
        let symbols = [
            (":=", Token::Declare),
            ("=", Token::Assign),
            ("|", Token::Pipe),
            (",", Token::Comma),
            ("(", Token::LParen),
            (")", Token::RParen),
        ];
        for (text, token) in symbols {
            if rest.starts_with(text) {
                self.advance(text.len());
                return Ok(Some((start, token)));
            }
        }

        let mut chars = rest.chars();
        let Some(first) = chars.next() else {
            return Err(ParseError::new("unclosed action", start));
        };
        let second = chars.next();

        let token = match first {
            '"' => self.lex_quoted(start)?,
            '`' => self.lex_raw(start)?,
            '\'' => {
                return Err(ParseError::new(
                    "character constants are not supported",
                    start,
                ))
            }
            '$' => {
                self.advance(1);
                let name = self.take_ident();
                let mut ident = vec![format!("${name}")];
                ident.extend(self.take_field_chain());
                self.chain_end(start)?;
                Token::Variable(ident)
            }
            '.' if second.is_some_and(is_ident_start) => {
                let path = self.take_field_chain();
                self.chain_end(start)?;
                Token::Field(path)
            }
            '.' if second.is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            '.' => {
                self.advance(1);
                Token::Dot
            }
            '+' | '-' if second.is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                self.lex_number()
            }
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => {
                let word = self.take_ident();
                match word.as_str() {
                    "if" => Token::If,
                    "else" => Token::Else,
                    "end" => Token::End,
                    "range" => Token::Range,
                    "with" => Token::With,
                    "template" => Token::Template,
                    "define" => Token::Define,
                    "block" => Token::Block,
                    "break" => Token::Break,
                    "continue" => Token::Continue,
                    "nil" => Token::Nil,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                }
            }
            c => {
                return Err(ParseError::new(
                    format!("unexpected {c:?} in action"),
                    start,
                ))
            }
        };
        Ok(Some((start, token)))
    }

    fn take_ident(&mut self) -> String {
        let ident: String = self
            .remaining()
            .chars()
            .take_while(|c| is_ident_char(*c))
            .collect();
        self.advance(ident.len());
        ident
    }

    /// Consumes `.a.b.c` and returns `["a", "b", "c"]`.
    fn take_field_chain(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        loop {
            let mut chars = self.remaining().chars();
            if chars.next() != Some('.') || !chars.next().is_some_and(is_ident_start) {
                return path;
            }
            self.advance(1);
            path.push(self.take_ident());
        }
    }

    /// A chain may not end in a bare `.`, as in `.x.`.
    fn chain_end(&self, start: usize) -> Result<(), ParseError> {
        if self.remaining().starts_with('.') {
            let term = &self.input[start..self.cursor];
            return Err(ParseError::new(
                format!("unexpected . after term {term:?}"),
                self.cursor,
            ));
        }
        Ok(())
    }

    fn lex_number(&mut self) -> Token {
        let rest = self.remaining();
        let mut len = 0;
        let mut prev = None;
        for (i, c) in rest.char_indices() {
            let sign = matches!(c, '+' | '-');
            let exponent_sign = sign && matches!(prev, Some('e' | 'E' | 'p' | 'P'));
            if (sign && i == 0) || exponent_sign || c.is_ascii_alphanumeric() || c == '.' || c == '_'
            {
                len = i + c.len_utf8();
                prev = Some(c);
            } else {
                break;
            }
        }
        let text = rest[..len].to_string();
        self.advance(len);
        Token::Number(text)
    }

    fn lex_quoted(&mut self, start: usize) -> Result<Token, ParseError> {
        let rest = self.remaining();
        let mut text = String::new();
        let mut chars = rest.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    let quoted = rest[..=i].to_string();
                    self.advance(i + 1);
                    return Ok(Token::StringLit { quoted, text });
                }
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, 'r')) => text.push('\r'),
                    Some((_, '0')) => text.push('\0'),
                    Some((_, esc)) => text.push(esc),
                    None => break,
                },
                c => text.push(c),
            }
        }
        Err(ParseError::new("unterminated quoted string", start))
    }

    fn lex_raw(&mut self, start: usize) -> Result<Token, ParseError> {
        let rest = self.remaining();
        let Some(close) = rest[1..].find('`') else {
            return Err(ParseError::new("unterminated raw quoted string", start));
        };
        let quoted = rest[..close + 2].to_string();
        let text = rest[1..close + 1].to_string();
        self.advance(close + 2);
        Ok(Token::StringLit { quoted, text })
    }
}
