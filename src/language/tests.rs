use crate::language::ast::{AssignTarget, Expr, Literal, Message, Statement};
use crate::language::lexer::lex;
use crate::language::parser::parse;
use crate::language::token::TokenKind;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .expect("lex")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn statements(source: &str) -> Vec<Statement> {
    parse(source).expect("parse").statements
}

fn only_statement(source: &str) -> Statement {
    let mut stmts = statements(source);
    assert_eq!(stmts.len(), 1, "expected a single statement");
    stmts.remove(0)
}

fn as_message(expr: &Expr) -> &Message {
    match expr {
        Expr::Message(message) => message,
        other => panic!("expected message, got {:?}", other),
    }
}

#[test]
fn lexes_assignment_line() {
    assert_eq!(
        kinds("x = 1\n"),
        vec![
            TokenKind::Identifier("x".into()),
            TokenKind::Eq,
            TokenKind::Integer(1),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn operators_lex_as_selector_identifiers() {
    assert_eq!(
        kinds("x <= 2 == y\n"),
        vec![
            TokenKind::Identifier("x".into()),
            TokenKind::Identifier("<=".into()),
            TokenKind::Integer(2),
            TokenKind::Identifier("==".into()),
            TokenKind::Identifier("y".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keywords_are_reserved() {
    assert_eq!(
        kinds("true ifTrue\n"),
        vec![
            TokenKind::True,
            TokenKind::IfTrue,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn indentation_produces_indent_and_dedent() {
    assert_eq!(
        kinds("a\n    b\n        c\nd\n"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("b".into()),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("c".into()),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Dedent,
            TokenKind::Identifier("d".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn blank_and_comment_lines_have_no_structure() {
    assert_eq!(
        kinds("a\n\n# note\n    b\n"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("b".into()),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn trailing_comment_keeps_the_newline() {
    assert_eq!(
        kinds("a # trailing\nb\n"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Newline,
            TokenKind::Identifier("b".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn crlf_is_accepted() {
    assert_eq!(
        kinds("a\r\nb\r\n"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Newline,
            TokenKind::Identifier("b".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn missing_final_newline_is_synthesized() {
    assert_eq!(
        kinds("a"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn float_and_integer_literals() {
    assert_eq!(
        kinds("3.25 7\n"),
        vec![
            TokenKind::Float(3.25),
            TokenKind::Integer(7),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn string_literal_records_content() {
    assert_eq!(
        kinds("\"hi there\"\n"),
        vec![
            TokenKind::Str("hi there".into()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn tab_in_indentation_is_an_error() {
    let errors = lex("\tx = 1\n").expect_err("tabs must be rejected");
    assert!(errors.iter().any(|e| e.message.contains("Tabs")));
}

#[test]
fn unterminated_string_is_an_error() {
    let errors = lex("\"abc").expect_err("unterminated string");
    assert!(errors.iter().any(|e| e.message.contains("Unterminated")));
}

#[test]
fn unaligned_dedent_is_an_error() {
    let errors = lex("a\n        b\n    c\n").expect_err("bad dedent");
    assert!(errors.iter().any(|e| e.message.contains("Unindent")));
}

#[test]
fn parses_variable_assignment() {
    let stmt = only_statement("x = 5\n");
    let Statement::Assign(assign) = stmt else {
        panic!("expected assignment");
    };
    assert!(matches!(assign.target, AssignTarget::Variable(ref name) if name == "x"));
    assert!(matches!(assign.value, Expr::Literal(Literal::Int(5, _))));
}

#[test]
fn parses_slot_assignment() {
    let stmts = statements("i = 1\ni value = 2\n");
    let Statement::Assign(assign) = &stmts[1] else {
        panic!("expected assignment");
    };
    let AssignTarget::Slot { object, slot } = &assign.target else {
        panic!("expected slot target");
    };
    assert!(matches!(object, Expr::Identifier(ident) if ident.name == "i"));
    assert_eq!(slot, "value");
}

#[test]
fn parses_single_line_method_definition() {
    let stmt = only_statement("Number double = return self value * 2\n");
    let Statement::MethodDef(def) = stmt else {
        panic!("expected method definition");
    };
    assert_eq!(def.selector, "double");
    assert!(def.params.is_empty());
    assert_eq!(def.body.statements.len(), 1);
    assert!(matches!(def.body.statements[0], Statement::Return(_)));
}

#[test]
fn method_parameters_come_from_the_left_hand_side() {
    let stmt = only_statement("Number addTo other = return self value + other value\n");
    let Statement::MethodDef(def) = stmt else {
        panic!("expected method definition");
    };
    assert_eq!(def.selector, "addTo");
    assert_eq!(def.params, vec!["other".to_string()]);
}

#[test]
fn declared_arity_directs_argument_parsing() {
    let stmts = statements("Number addTo other = return self value + other value\n5 addTo 3\n");
    let Statement::Expr(expr) = &stmts[1] else {
        panic!("expected expression statement");
    };
    let message = as_message(expr);
    assert_eq!(message.selector, "addTo");
    assert_eq!(message.args.len(), 1);
}

#[test]
fn operators_consume_one_argument() {
    let stmts = statements("x = 5\nx + 1 print\n");
    let Statement::Expr(expr) = &stmts[1] else {
        panic!("expected expression statement");
    };
    let print = as_message(expr);
    assert_eq!(print.selector, "print");
    assert!(print.args.is_empty());
    let plus = as_message(&print.receiver);
    assert_eq!(plus.selector, "+");
    assert_eq!(plus.args.len(), 1);
}

#[test]
fn unknown_selectors_fall_back_to_zero_arguments() {
    let stmt = only_statement("5 frobnicate\n");
    let Statement::Expr(expr) = stmt else {
        panic!("expected expression statement");
    };
    let message = as_message(&expr);
    assert_eq!(message.selector, "frobnicate");
    assert!(message.args.is_empty());
}

#[test]
fn indented_block_attaches_to_the_message() {
    let stmt = only_statement("true ifTrue\n    1\n");
    let Statement::Expr(expr) = stmt else {
        panic!("expected expression statement");
    };
    let message = as_message(&expr);
    assert_eq!(message.selector, "ifTrue");
    let block = message.block.as_ref().expect("block argument");
    assert_eq!(block.statements.len(), 1);
    assert!(message.else_block.is_none());
}

#[test]
fn if_true_if_false_fold_into_one_message() {
    let stmt = only_statement("true ifTrue\n    1\nifFalse\n    2\n");
    let Statement::Expr(expr) = stmt else {
        panic!("expected expression statement");
    };
    let message = as_message(&expr);
    assert_eq!(message.selector, "ifTrue");
    assert!(message.block.is_some());
    let else_block = message.else_block.as_ref().expect("paired branch");
    assert_eq!(else_block.statements.len(), 1);
}

#[test]
fn parenthesized_receiver_regroups_the_chain() {
    let stmt = only_statement("(1 + 2) print\n");
    let Statement::Expr(expr) = stmt else {
        panic!("expected expression statement");
    };
    let print = as_message(&expr);
    assert_eq!(print.selector, "print");
    assert!(matches!(print.receiver, Expr::Paren { .. }));
}

#[test]
fn methods_on_variables_get_their_own_slot_view() {
    let stmts = statements("p = Object clone\np greet name = return name\np greet \"hi\"\n");
    let Statement::Expr(expr) = &stmts[2] else {
        panic!("expected expression statement");
    };
    let message = as_message(expr);
    assert_eq!(message.selector, "greet");
    assert_eq!(message.args.len(), 1);
}

#[test]
fn control_statements_parse_bare() {
    let stmts = statements("break\ncontinue\nreturn 1\n");
    assert!(matches!(stmts[0], Statement::Break(_)));
    assert!(matches!(stmts[1], Statement::Continue(_)));
    assert!(matches!(stmts[2], Statement::Return(_)));
}

#[test]
fn malformed_method_definition_is_rejected() {
    let errors = parse("Number f a b = 5\n").expect_err("bad definition");
    assert!(
        errors
            .errors
            .iter()
            .any(|e| e.message.contains("Malformed method definition"))
    );
}

#[test]
fn missing_expression_after_equals_is_rejected() {
    let errors = parse("x =\n").expect_err("missing value");
    assert!(
        errors
            .errors
            .iter()
            .any(|e| e.message.contains("Expected expression"))
    );
}

#[test]
fn missing_argument_is_rejected() {
    let errors = parse("1 +\n").expect_err("missing operand");
    assert!(errors.errors.iter().any(|e| e.message.contains("argument")));
}
