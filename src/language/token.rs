use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Str(String),

    True,
    False,
    Return,
    Break,
    Continue,
    IfTrue,
    IfFalse,
    WhileTrue,
    Clone,

    Eq,
    LParen,
    RParen,

    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// The selector this token denotes when it appears in message position.
    /// Control-flow keywords are reserved words but still name messages.
    pub fn selector_name(&self) -> Option<&str> {
        match self {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::IfTrue => Some("ifTrue"),
            TokenKind::IfFalse => Some("ifFalse"),
            TokenKind::WhileTrue => Some("whileTrue"),
            TokenKind::Clone => Some("clone"),
            _ => None,
        }
    }

    pub fn starts_primary(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::LParen
        )
    }
}
