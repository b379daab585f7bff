use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "return" => TokenKind::Return,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "ifTrue" => TokenKind::IfTrue,
        "ifFalse" => TokenKind::IfFalse,
        "whileTrue" => TokenKind::WhileTrue,
        "clone" => TokenKind::Clone,
        _ => return None,
    })
}

/// Operator characters take part in identifiers: `+`, `<=`, `==` and friends
/// are ordinary selectors, not dedicated tokens.
fn is_selector_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch == '_'
        || matches!(ch, '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!')
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    indent_stack: Vec<usize>,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
            indent_stack: vec![0],
            at_line_start: true,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            if self.at_line_start {
                self.lex_line_start();
                continue;
            }
            match ch {
                '#' => self.eat_comment(),
                '\r' => {
                    self.bump();
                }
                '\n' => self.lex_newline(),
                ' ' | '\t' => {
                    self.bump();
                }
                '"' => self.lex_string(),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '=' if self.peek() != Some('=') => self.single(TokenKind::Eq),
                ch if is_selector_char(ch) => self.lex_identifier(),
                ch => {
                    let start = self.offset;
                    self.bump();
                    self.error(start, self.offset, format!("Unexpected character '{}'", ch));
                }
            }
        }

        // A source that stops mid-line still terminates its last statement.
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            self.push_token(TokenKind::Newline, self.offset, self.offset);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push_token(TokenKind::Dedent, self.offset, self.offset);
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    /// Measure leading whitespace and synthesize `Indent`/`Dedent` tokens.
    /// Blank and comment-only lines contribute nothing to block structure.
    fn lex_line_start(&mut self) {
        let ws_start = self.offset;
        let mut width = 0usize;
        let mut saw_tab = false;
        while let Some(ch) = self.current {
            match ch {
                ' ' => width += 1,
                '\t' => {
                    saw_tab = true;
                    width += 1;
                }
                _ => break,
            }
            self.bump();
        }

        match self.current {
            None => {
                self.at_line_start = false;
            }
            Some('\r') => {
                self.bump();
                if self.current == Some('\n') {
                    self.bump();
                }
            }
            Some('\n') => {
                self.bump();
            }
            Some('#') => {
                self.eat_comment();
                if self.current == Some('\r') {
                    self.bump();
                }
                if self.current == Some('\n') {
                    self.bump();
                }
            }
            Some(_) => {
                if saw_tab {
                    self.error(ws_start, self.offset, "Tabs are not allowed in indentation");
                }
                self.apply_indent(width, ws_start);
                self.at_line_start = false;
            }
        }
    }

    fn apply_indent(&mut self, width: usize, ws_start: usize) {
        let top = *self.indent_stack.last().unwrap_or(&0);
        if width > top {
            self.indent_stack.push(width);
            self.push_token(TokenKind::Indent, ws_start, self.offset);
            return;
        }
        while self.indent_stack.len() > 1 && *self.indent_stack.last().unwrap() > width {
            self.indent_stack.pop();
            self.push_token(TokenKind::Dedent, ws_start, self.offset);
        }
        if *self.indent_stack.last().unwrap() != width {
            self.error(
                ws_start,
                self.offset,
                "Unindent does not match any outer indentation level",
            );
        }
    }

    fn lex_newline(&mut self) {
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::Newline)
        ) {
            self.push_token(TokenKind::Newline, self.offset, self.offset + 1);
        }
        self.bump();
        self.at_line_start = true;
    }

    fn eat_comment(&mut self) {
        while let Some(ch) = self.current {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.bump();
        }
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if is_selector_char(ch) {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = keyword(slice).unwrap_or_else(|| TokenKind::Identifier(slice.to_string()));
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.current == Some('.') {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    is_float = true;
                    self.bump(); // consume '.'
                    while let Some(ch) = self.current {
                        if ch.is_ascii_digit() {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        let end = self.offset;
        let text = &self.src[start..end];
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.push_token(TokenKind::Float(value), start, end),
                Err(_) => self.error(start, end, "Invalid float literal"),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.push_token(TokenKind::Integer(value), start, end),
                Err(_) => self.error(start, end, "Integer literal out of range"),
            }
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            if ch == '"' {
                self.bump();
                let end = self.offset;
                self.push_token(TokenKind::Str(value), start, end);
                return;
            }
            value.push(ch);
            self.bump();
        }
        self.error(start, self.offset, "Unterminated string literal");
    }
}
