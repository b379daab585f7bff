use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};
use std::collections::HashMap;

pub fn parse(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

/// Parse-time view of the slots declared so far. Message sends consume as
/// many argument expressions as the target method's declared arity, so the
/// parser keeps its own table of prototypes, their methods, and which
/// prototype each variable was last bound to.
struct SlotView {
    protos: HashMap<String, ProtoEntry>,
    bindings: HashMap<String, String>,
    /// Union of every registered method, consulted when a receiver's
    /// prototype cannot be determined from the source alone.
    flat: HashMap<String, usize>,
}

struct ProtoEntry {
    parent: Option<String>,
    methods: HashMap<String, usize>,
}

const OPERATORS: [&str; 10] = ["+", "-", "*", "/", "%", "<", "<=", "==", ">=", ">"];

impl SlotView {
    fn bootstrap() -> Self {
        let mut view = Self {
            protos: HashMap::new(),
            bindings: HashMap::new(),
            flat: HashMap::new(),
        };

        let mut object = ProtoEntry {
            parent: None,
            methods: HashMap::new(),
        };
        object.methods.insert("clone".into(), 0);
        object.methods.insert("print".into(), 0);
        object.methods.insert("==".into(), 1);

        let mut number = ProtoEntry {
            parent: Some("Object".into()),
            methods: HashMap::new(),
        };
        for op in OPERATORS {
            number.methods.insert(op.into(), 1);
        }

        let boolean = ProtoEntry {
            parent: Some("Object".into()),
            methods: HashMap::new(),
        };
        let mut string = ProtoEntry {
            parent: Some("Object".into()),
            methods: HashMap::new(),
        };
        string.methods.insert("==".into(), 1);

        for (name, entry) in [
            ("Object", object),
            ("Number", number),
            ("Boolean", boolean),
            ("String", string),
        ] {
            for (selector, arity) in &entry.methods {
                view.flat.insert(selector.clone(), *arity);
            }
            view.protos.insert(name.to_string(), entry);
            view.bindings.insert(name.to_string(), name.to_string());
        }
        view
    }

    /// Declared arity of `selector` as seen from `receiver`'s static
    /// prototype; unknown selectors parse with zero arguments.
    fn arity_for(&self, selector: &str, receiver: Option<&str>) -> usize {
        match receiver {
            Some(proto) => {
                let mut current = Some(proto);
                while let Some(name) = current {
                    let Some(entry) = self.protos.get(name) else {
                        break;
                    };
                    if let Some(arity) = entry.methods.get(selector) {
                        return *arity;
                    }
                    current = entry.parent.as_deref();
                }
                0
            }
            None => self.flat.get(selector).copied().unwrap_or(0),
        }
    }

    fn register_method(&mut self, receiver: Option<&str>, selector: &str, arity: usize) {
        if let Some(name) = receiver {
            if !self.protos.contains_key(name) {
                // A method defined on a plain variable gives it its own
                // derived entry so later sends resolve through it.
                let parent = self.bindings.get(name).cloned();
                self.protos.insert(
                    name.to_string(),
                    ProtoEntry {
                        parent,
                        methods: HashMap::new(),
                    },
                );
                self.bindings.insert(name.to_string(), name.to_string());
            }
            if let Some(entry) = self.protos.get_mut(name) {
                entry.methods.insert(selector.to_string(), arity);
            }
        }
        self.flat.insert(selector.to_string(), arity);
    }

    fn note_binding(&mut self, name: &str, proto: Option<String>) {
        match proto {
            Some(proto) => {
                self.bindings.insert(name.to_string(), proto);
            }
            None => {
                self.bindings.remove(name);
            }
        }
    }

    fn static_proto_of(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Literal(Literal::Int(..)) | Expr::Literal(Literal::Float(..)) => {
                Some("Number".into())
            }
            Expr::Literal(Literal::Bool(..)) => Some("Boolean".into()),
            Expr::Literal(Literal::Str(..)) => Some("String".into()),
            Expr::Identifier(ident) => self.bindings.get(&ident.name).cloned(),
            Expr::Paren { inner, .. } => self.static_proto_of(inner),
            Expr::Message(message) => match message.selector.as_str() {
                "clone" => self.static_proto_of(&message.receiver),
                "+" | "-" | "*" | "/" | "%" => Some("Number".into()),
                "<" | "<=" | "==" | ">=" | ">" => Some("Boolean".into()),
                _ => None,
            },
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    view: SlotView,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            view: SlotView::bootstrap(),
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            self.skip_newlines();
            if self.is_eof() {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Return) => self.parse_return(),
            Some(TokenKind::Break) => {
                let span = self.advance().span;
                Ok(Statement::Break(span))
            }
            Some(TokenKind::Continue) => {
                let span = self.advance().span;
                Ok(Statement::Continue(span))
            }
            _ => {
                if let Some(stmt) = self.try_parse_assignment()? {
                    return Ok(stmt);
                }
                let expr = self.parse_expression()?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.expect(TokenKind::Return)?.span.start;
        let value = self.parse_expression()?;
        let end = self.last_span_end(start);
        Ok(Statement::Return(ReturnStmt {
            value,
            span: Span::new(start, end),
        }))
    }

    /// Scan `primary selector* '='` to tell assignments and method
    /// definitions apart from plain expressions; on no match the scan
    /// rewinds and the caller parses an expression.
    fn try_parse_assignment(&mut self) -> Result<Option<Statement>, SyntaxError> {
        if !self.at_primary_start() {
            return Ok(None);
        }
        let checkpoint = self.pos;
        let receiver = match self.parse_primary() {
            Ok(expr) => expr,
            Err(_) => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };
        let mut selectors: Vec<(String, Span)> = Vec::new();
        while let Some(name) = self.peek_selector() {
            let span = self.advance().span;
            selectors.push((name, span));
        }
        if !self.check(TokenKind::Eq) {
            self.pos = checkpoint;
            return Ok(None);
        }
        self.advance(); // '='

        let start = expr_span(&receiver).start;
        match selectors.len() {
            0 => {
                let target_span = expr_span(&receiver);
                let Expr::Identifier(ident) = receiver else {
                    return Err(SyntaxError::new(
                        "Assignment target must be an identifier",
                        target_span,
                    ));
                };
                let value = self.parse_expression()?;
                let proto = self.view.static_proto_of(&value);
                self.view.note_binding(&ident.name, proto);
                let span = Span::new(start, self.last_span_end(start));
                Ok(Some(Statement::Assign(AssignStmt {
                    target: AssignTarget::Variable(ident.name),
                    value,
                    span,
                })))
            }
            1 => {
                let (selector, _) = selectors.into_iter().next().unwrap();
                if self.method_body_follows() {
                    let def = self.parse_method_def(receiver, selector, Vec::new(), start)?;
                    Ok(Some(Statement::MethodDef(def)))
                } else {
                    let value = self.parse_expression()?;
                    let span = Span::new(start, self.last_span_end(start));
                    Ok(Some(Statement::Assign(AssignStmt {
                        target: AssignTarget::Slot {
                            object: receiver,
                            slot: selector,
                        },
                        value,
                        span,
                    })))
                }
            }
            _ => {
                let mut names = selectors.into_iter();
                let (selector, _) = names.next().unwrap();
                let params: Vec<String> = names.map(|(name, _)| name).collect();
                if !self.method_body_follows() {
                    return Err(self
                        .error_here("Malformed method definition")
                        .with_help("a method body is `return <expr>` or an indented block"));
                }
                let def = self.parse_method_def(receiver, selector, params, start)?;
                Ok(Some(Statement::MethodDef(def)))
            }
        }
    }

    fn method_body_follows(&self) -> bool {
        self.check(TokenKind::Return)
            || (self.check(TokenKind::Newline) && self.check_at(1, TokenKind::Indent))
    }

    fn parse_method_def(
        &mut self,
        receiver: Expr,
        selector: String,
        params: Vec<String>,
        start: usize,
    ) -> Result<MethodDef, SyntaxError> {
        // Register before parsing the body so recursive sends and every
        // later use parse with the declared arity. A named receiver gets the
        // method on its own view entry; anything else lands on the entry of
        // its static prototype.
        let target = match &receiver {
            Expr::Identifier(ident) => Some(ident.name.clone()),
            other => self.view.static_proto_of(other),
        };
        self.view
            .register_method(target.as_deref(), &selector, params.len());

        let body = if self.check(TokenKind::Return) {
            let stmt = self.parse_return()?;
            let span = match &stmt {
                Statement::Return(ret) => ret.span,
                _ => Span::new(start, self.last_span_end(start)),
            };
            Block {
                statements: vec![stmt],
                span,
            }
        } else {
            self.expect(TokenKind::Newline)?;
            self.parse_block()?
        };

        let span = Span::new(start, body.span.end);
        Ok(MethodDef {
            receiver,
            selector,
            params,
            body,
            span,
        })
    }

    /// Message chains: `receiver selector arg.. selector arg.. ...`, each
    /// selector consuming its declared arity worth of primary expressions.
    /// An indented block binds to the selector before it and ends the chain.
    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        while let Some(selector) = self.peek_selector() {
            let sel_span = self.advance().span;

            let arity = match selector.as_str() {
                "ifTrue" | "ifFalse" | "whileTrue" | "clone" => 0,
                _ => {
                    let proto = self.view.static_proto_of(&expr);
                    self.view.arity_for(&selector, proto.as_deref())
                }
            };

            let mut args = Vec::with_capacity(arity);
            for _ in 0..arity {
                if !self.at_primary_start() {
                    return Err(self.error_here(&format!(
                        "`{}` expects {} argument{}",
                        selector,
                        arity,
                        if arity == 1 { "" } else { "s" }
                    )));
                }
                args.push(self.parse_primary()?);
            }

            let block = if self.check(TokenKind::Newline) && self.check_at(1, TokenKind::Indent) {
                self.advance(); // newline
                Some(self.parse_block()?)
            } else {
                None
            };
            let has_block = block.is_some();

            let else_block = if has_block && matches!(selector.as_str(), "ifTrue" | "ifFalse") {
                self.parse_opposite_branch(&selector)?
            } else {
                None
            };

            let start = expr_span(&expr).start;
            let end = self.last_span_end(sel_span.end);
            expr = Expr::Message(Box::new(Message {
                receiver: expr,
                selector,
                args,
                block,
                else_block,
                span: Span::new(start, end),
            }));

            if has_block {
                break;
            }
        }
        Ok(expr)
    }

    /// `cond ifTrue <block> ifFalse <block>` folds into one message so the
    /// condition is evaluated once and exactly one branch runs.
    fn parse_opposite_branch(&mut self, selector: &str) -> Result<Option<Block>, SyntaxError> {
        let opposite = if selector == "ifTrue" {
            TokenKind::IfFalse
        } else {
            TokenKind::IfTrue
        };
        if !self.check(opposite) {
            return Ok(None);
        }
        self.advance();
        if !(self.check(TokenKind::Newline) && self.check_at(1, TokenKind::Indent)) {
            return Err(self.error_here("Expected an indented block for the paired branch"));
        }
        self.advance(); // newline
        Ok(Some(self.parse_block()?))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Integer(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Int(value, span)))
            }
            Some(TokenKind::Float(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Float(value, span)))
            }
            Some(TokenKind::Str(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Str(value, span)))
            }
            Some(TokenKind::True) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(true, span)))
            }
            Some(TokenKind::False) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(false, span)))
            }
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Expr::Identifier(Identifier { name, span }))
            }
            Some(TokenKind::LParen) => {
                let start = self.advance().span.start;
                let inner = self.parse_expression()?;
                let end = self.expect(TokenKind::RParen)?.span.end;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: Span::new(start, end),
                })
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.current_span_start();
        self.expect(TokenKind::Indent)?;
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::Dedent) {
                self.advance();
                break;
            }
            if self.is_eof() {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        let end = self.last_span_end(start);
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn at_primary_start(&self) -> bool {
        self.tokens
            .get(self.pos)
            .is_some_and(|t| t.kind.starts_primary())
    }

    fn peek_selector(&self) -> Option<String> {
        self.tokens
            .get(self.pos)
            .and_then(|t| t.kind.selector_name().map(str::to_string))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {:?}", kind)))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn check_at(&self, n: usize, kind: TokenKind) -> bool {
        matches!(self.tokens.get(self.pos + n), Some(t) if t.kind == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let token = self
            .tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().unwrap());
        self.pos = (self.pos + 1).min(self.tokens.len());
        token
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span.end).unwrap_or(0))
    }

    fn last_span_end(&self, fallback: usize) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(fallback)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.span)
                    .unwrap_or_else(|| Span::new(0, 0))
            });
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    /// Skip to the start of the next logical line.
    fn synchronize(&mut self) {
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::Newline | TokenKind::Dedent) => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}
