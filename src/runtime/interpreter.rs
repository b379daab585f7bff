use crate::language::ast::{
    AssignStmt, AssignTarget, Block, Expr, Literal, Message, MethodDef, Program, Statement,
};
use crate::language::span::Span;
use crate::runtime::builtins::Builtins;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::runtime::object::{self, Obj, ObjRef};
use crate::runtime::value::{MethodValue, NativeMethod, Value};
use std::io::{self, Write};
use std::rc::Rc;

/// Non-value results that unwind the evaluator stack until a frame catches
/// them: methods catch `Return`, loops catch `Break` and `Continue`.
enum FlowSignal {
    Return(Value, Span),
    Break(Span),
    Continue(Span),
}

/// Every evaluation step yields either a value or an in-flight unwind.
enum Eval {
    Value(Value),
    Flow(FlowSignal),
}

enum Num {
    Int(i64),
    Float(f64),
}

pub struct Interpreter {
    env: Environment,
    builtins: Builtins,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Build an interpreter whose `print` output goes to `out` instead of
    /// stdout.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let builtins = Builtins::bootstrap();
        let mut env = Environment::new();
        env.bind_root("Object", Value::Object(builtins.object.clone()));
        env.bind_root("Number", Value::Object(builtins.number.clone()));
        env.bind_root("Boolean", Value::Object(builtins.boolean.clone()));
        env.bind_root("String", Value::Object(builtins.string.clone()));
        env.bind_root("vm_clone", Value::Native(NativeMethod::Clone));
        env.bind_root("vm_print", Value::Native(NativeMethod::Print));
        Self { env, builtins, out }
    }

    /// Read a binding from the current environment (top frame, then root).
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.env.get(name)
    }

    pub fn eval_program(&mut self, program: &Program) -> RuntimeResult<Value> {
        let mut result = self.builtins.unit_value();
        for statement in &program.statements {
            match self.eval_statement(statement)? {
                Eval::Value(value) => result = value,
                Eval::Flow(signal) => return Err(out_of_context(signal)),
            }
        }
        Ok(result)
    }

    fn eval_statement(&mut self, statement: &Statement) -> RuntimeResult<Eval> {
        match statement {
            Statement::Expr(expr) => self.eval_expr(expr),
            Statement::Assign(stmt) => self.eval_assign(stmt),
            Statement::MethodDef(def) => self.eval_method_def(def),
            Statement::Return(stmt) => {
                let value = match self.eval_expr(&stmt.value)? {
                    Eval::Value(value) => value,
                    flow @ Eval::Flow(_) => return Ok(flow),
                };
                Ok(Eval::Flow(FlowSignal::Return(value, stmt.span)))
            }
            Statement::Break(span) => Ok(Eval::Flow(FlowSignal::Break(*span))),
            Statement::Continue(span) => Ok(Eval::Flow(FlowSignal::Continue(*span))),
        }
    }

    fn eval_assign(&mut self, stmt: &AssignStmt) -> RuntimeResult<Eval> {
        let value = match self.eval_expr(&stmt.value)? {
            Eval::Value(value) => value,
            flow @ Eval::Flow(_) => return Ok(flow),
        };
        match &stmt.target {
            AssignTarget::Variable(name) => {
                let stored = self.builtins.box_value(value);
                self.env.bind(name, stored.clone());
                Ok(Eval::Value(stored))
            }
            AssignTarget::Slot { object, slot } => {
                let receiver = match self.eval_expr(object)? {
                    Eval::Value(value) => value,
                    flow @ Eval::Flow(_) => return Ok(flow),
                };
                let owner = self.receiver_object(receiver, "=", stmt.span)?;
                // `value` is the payload slot of the boxed primitives; it
                // keeps the raw so arithmetic round-trips stay flat.
                let stored = if slot == "value" {
                    unboxed_payload(value)
                } else {
                    self.builtins.box_value(value)
                };
                owner.borrow_mut().set_slot(slot, stored.clone());
                Ok(Eval::Value(stored))
            }
        }
    }

    fn eval_method_def(&mut self, def: &MethodDef) -> RuntimeResult<Eval> {
        let receiver = match self.eval_expr(&def.receiver)? {
            Eval::Value(value) => value,
            flow @ Eval::Flow(_) => return Ok(flow),
        };
        let owner = self.receiver_object(receiver, &def.selector, def.span)?;
        let method = MethodValue {
            selector: def.selector.clone(),
            params: def.params.clone(),
            body: def.body.clone(),
        };
        owner
            .borrow_mut()
            .set_slot(&def.selector, Value::Method(Rc::new(method)));
        Ok(Eval::Value(Value::Object(owner)))
    }

    fn eval_expr(&mut self, expr: &Expr) -> RuntimeResult<Eval> {
        match expr {
            Expr::Literal(literal) => Ok(Eval::Value(self.eval_literal(literal))),
            Expr::Identifier(ident) => match self.env.get(&ident.name) {
                Some(value) => Ok(Eval::Value(value)),
                None => Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedVariable {
                        name: ident.name.clone(),
                    },
                    ident.span,
                )),
            },
            Expr::Paren { inner, .. } => self.eval_expr(inner),
            Expr::Message(message) => self.eval_message(message),
        }
    }

    fn eval_literal(&mut self, literal: &Literal) -> Value {
        let raw = match literal {
            Literal::Int(value, _) => Value::Int(*value),
            Literal::Float(value, _) => Value::Float(*value),
            Literal::Bool(value, _) => Value::Bool(*value),
            Literal::Str(value, _) => Value::Str(value.clone()),
        };
        self.builtins.box_value(raw)
    }

    fn eval_message(&mut self, message: &Message) -> RuntimeResult<Eval> {
        match message.selector.as_str() {
            "whileTrue" => {
                let Some(block) = &message.block else {
                    return Err(self.block_required("whileTrue", message.span));
                };
                return self.eval_while(message, block);
            }
            "ifTrue" | "ifFalse" => {
                let Some(block) = &message.block else {
                    return Err(self.block_required(&message.selector, message.span));
                };
                return self.eval_conditional(message, block);
            }
            _ => {}
        }

        let receiver = match self.eval_expr(&message.receiver)? {
            Eval::Value(value) => value,
            flow @ Eval::Flow(_) => return Ok(flow),
        };
        self.send(receiver, message)
    }

    fn send(&mut self, receiver: Value, message: &Message) -> RuntimeResult<Eval> {
        let receiver = self.receiver_object(receiver, &message.selector, message.span)?;
        let Some(slot) = object::get_slot(&receiver, &message.selector) else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::DoesNotUnderstand {
                    selector: message.selector.clone(),
                    receiver: self.describe_chain(&receiver),
                },
                message.span,
            ));
        };

        match slot {
            Value::Method(method) => {
                if message.args.len() != method.params.len() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::ArityMismatch {
                            selector: message.selector.clone(),
                            expected: method.params.len(),
                            received: message.args.len(),
                        },
                        message.span,
                    ));
                }
                let mut args = Vec::with_capacity(message.args.len());
                for arg in &message.args {
                    match self.eval_expr(arg)? {
                        Eval::Value(value) => args.push(value),
                        flow @ Eval::Flow(_) => return Ok(flow),
                    }
                }
                self.invoke(receiver, &method, args)
            }
            Value::Native(native) => {
                if message.args.len() != native.arity() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::ArityMismatch {
                            selector: message.selector.clone(),
                            expected: native.arity(),
                            received: message.args.len(),
                        },
                        message.span,
                    ));
                }
                let mut args = Vec::with_capacity(message.args.len());
                for arg in &message.args {
                    match self.eval_expr(arg)? {
                        Eval::Value(value) => args.push(value),
                        flow @ Eval::Flow(_) => return Ok(flow),
                    }
                }
                self.call_native(native, receiver, args, message.span)
                    .map(Eval::Value)
            }
            value => {
                if message.args.is_empty() && message.block.is_none() {
                    // Plain slot: a field read.
                    Ok(Eval::Value(value))
                } else {
                    Err(RuntimeError::new(
                        RuntimeErrorKind::TypeError {
                            message: format!("`{}` is not a method", message.selector),
                        },
                        message.span,
                    ))
                }
            }
        }
    }

    /// Run a method body in a fresh activation frame. The frame catches
    /// `Return`; a loose `break`/`continue` has nowhere left to go.
    fn invoke(&mut self, receiver: ObjRef, method: &MethodValue, args: Vec<Value>) -> RuntimeResult<Eval> {
        self.env.push_frame();
        self.env.bind("self", Value::Object(receiver));
        for (param, arg) in method.params.iter().zip(args) {
            let boxed = self.builtins.box_value(arg);
            self.env.bind(param, boxed);
        }
        let result = self.eval_block(&method.body);
        self.env.pop_frame();
        match result? {
            Eval::Value(value) => Ok(Eval::Value(value)),
            Eval::Flow(FlowSignal::Return(value, _)) => Ok(Eval::Value(value)),
            Eval::Flow(signal) => Err(out_of_context(signal)),
        }
    }

    /// A block's value is its last statement's value; flow signals pass
    /// through untouched (blocks never catch anything).
    fn eval_block(&mut self, block: &Block) -> RuntimeResult<Eval> {
        let mut result = self.builtins.unit_value();
        for statement in &block.statements {
            match self.eval_statement(statement)? {
                Eval::Value(value) => result = value,
                flow @ Eval::Flow(_) => return Ok(flow),
            }
        }
        Ok(Eval::Value(result))
    }

    fn eval_conditional(&mut self, message: &Message, block: &Block) -> RuntimeResult<Eval> {
        let receiver = match self.eval_expr(&message.receiver)? {
            Eval::Value(value) => value,
            flow @ Eval::Flow(_) => return Ok(flow),
        };
        let condition = self.boolean_payload(&receiver, &message.selector, message.span)?;
        let wants_true = message.selector == "ifTrue";
        if condition == wants_true {
            self.eval_block(block)
        } else if let Some(else_block) = &message.else_block {
            self.eval_block(else_block)
        } else {
            Ok(Eval::Value(self.builtins.unit_value()))
        }
    }

    /// `whileTrue` re-evaluates the receiver's syntax tree before every
    /// iteration; the loop is the frame that catches `Break` and `Continue`.
    fn eval_while(&mut self, message: &Message, block: &Block) -> RuntimeResult<Eval> {
        let mut result = self.builtins.unit_value();
        loop {
            let condition = match self.eval_expr(&message.receiver)? {
                Eval::Value(value) => value,
                flow @ Eval::Flow(_) => return Ok(flow),
            };
            if !self.boolean_payload(&condition, "whileTrue", message.span)? {
                break;
            }
            match self.eval_block(block)? {
                Eval::Value(value) => result = value,
                Eval::Flow(FlowSignal::Break(_)) => {
                    result = self.builtins.unit_value();
                    break;
                }
                Eval::Flow(FlowSignal::Continue(_)) => continue,
                flow @ Eval::Flow(FlowSignal::Return(..)) => return Ok(flow),
            }
        }
        Ok(Eval::Value(result))
    }

    fn call_native(
        &mut self,
        native: NativeMethod,
        receiver: ObjRef,
        args: Vec<Value>,
        span: Span,
    ) -> RuntimeResult<Value> {
        match native {
            NativeMethod::Clone => Ok(Value::Object(Obj::clone_of(&receiver))),
            NativeMethod::Print => {
                let text = printable(&receiver);
                writeln!(self.out, "{}", text).map_err(|err| {
                    RuntimeError::new(
                        RuntimeErrorKind::Message {
                            message: format!("I/O error while printing: {err}"),
                        },
                        span,
                    )
                })?;
                Ok(Value::Object(receiver))
            }
            NativeMethod::IdentityEq => {
                let identical = match &args[0] {
                    Value::Object(other) => object::same_object(&receiver, other),
                    _ => false,
                };
                Ok(Value::Bool(identical))
            }
            NativeMethod::StrEq => {
                let lhs = self.string_payload(&Value::Object(receiver), span)?;
                let rhs = self.string_payload(&args[0], span)?;
                Ok(Value::Bool(lhs == rhs))
            }
            _ => {
                let lhs = self.numeric_payload(&Value::Object(receiver), native, span)?;
                let rhs = self.numeric_payload(&args[0], native, span)?;
                arith(native, lhs, rhs, span)
            }
        }
    }

    /// Autobox: a raw in receiver position becomes a fresh clone of the
    /// matching built-in prototype for the duration of this send.
    fn receiver_object(&self, value: Value, selector: &str, span: Span) -> RuntimeResult<ObjRef> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => match self.builtins.box_raw(&other) {
                Some(boxed) => Ok(boxed),
                None => Err(RuntimeError::new(
                    RuntimeErrorKind::TypeError {
                        message: format!("Cannot send `{}` to a primitive method", selector),
                    },
                    span,
                )),
            },
        }
    }

    fn boolean_payload(&self, value: &Value, selector: &str, span: Span) -> RuntimeResult<bool> {
        let payload = match value {
            Value::Bool(b) => Some(*b),
            Value::Object(obj) => match object::get_slot(obj, "value") {
                Some(Value::Bool(b)) => Some(b),
                _ => None,
            },
            _ => None,
        };
        payload.ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeError {
                    message: format!("`{}` requires a Boolean receiver", selector),
                },
                span,
            )
        })
    }

    fn numeric_payload(
        &self,
        value: &Value,
        native: NativeMethod,
        span: Span,
    ) -> RuntimeResult<Num> {
        let payload = match value {
            Value::Int(v) => Some(Num::Int(*v)),
            Value::Float(v) => Some(Num::Float(*v)),
            Value::Object(obj) => match object::get_slot(obj, "value") {
                Some(Value::Int(v)) => Some(Num::Int(v)),
                Some(Value::Float(v)) => Some(Num::Float(v)),
                _ => None,
            },
            _ => None,
        };
        payload.ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeError {
                    message: format!("`{}` requires numeric operands", native.selector()),
                },
                span,
            )
        })
    }

    fn string_payload(&self, value: &Value, span: Span) -> RuntimeResult<String> {
        let payload = match value {
            Value::Str(text) => Some(text.clone()),
            Value::Object(obj) => match object::get_slot(obj, "value") {
                Some(Value::Str(text)) => Some(text),
                _ => None,
            },
            _ => None,
        };
        payload.ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeError {
                    message: "`==` on String requires a String operand".into(),
                },
                span,
            )
        })
    }

    fn block_required(&self, selector: &str, span: Span) -> RuntimeError {
        RuntimeError::new(
            RuntimeErrorKind::TypeError {
                message: format!("`{}` expects a block argument", selector),
            },
            span,
        )
    }

    /// Shallow description of a receiver's prototype chain for diagnostics,
    /// e.g. `object < Number < Object`.
    fn describe_chain(&self, obj: &ObjRef) -> String {
        let mut labels = Vec::new();
        let mut current = Some(obj.clone());
        while let Some(node) = current {
            labels.push(self.proto_label(&node));
            current = node.borrow().proto.clone();
        }
        labels.join(" < ")
    }

    fn proto_label(&self, obj: &ObjRef) -> &'static str {
        if object::same_object(obj, &self.builtins.object) {
            "Object"
        } else if object::same_object(obj, &self.builtins.number) {
            "Number"
        } else if object::same_object(obj, &self.builtins.boolean) {
            "Boolean"
        } else if object::same_object(obj, &self.builtins.string) {
            "String"
        } else {
            "object"
        }
    }
}

fn out_of_context(signal: FlowSignal) -> RuntimeError {
    let (keyword, context, span) = match signal {
        FlowSignal::Return(_, span) => ("return", "a method", span),
        FlowSignal::Break(span) => ("break", "a loop", span),
        FlowSignal::Continue(span) => ("continue", "a loop", span),
    };
    RuntimeError::new(
        RuntimeErrorKind::ControlFlowOutOfContext { keyword, context },
        span,
    )
}

/// Textual form used by `print`: the raw payload for boxed primitives, a
/// plain marker for everything else.
fn printable(obj: &ObjRef) -> String {
    match object::get_slot(obj, "value") {
        Some(Value::Int(v)) => v.to_string(),
        Some(Value::Float(v)) => v.to_string(),
        Some(Value::Bool(v)) => v.to_string(),
        Some(Value::Str(text)) => text,
        _ => "Object".to_string(),
    }
}

/// Slot writes to `value` keep the raw payload; a boxed primitive on the
/// right-hand side is unwrapped first.
fn unboxed_payload(value: Value) -> Value {
    match &value {
        Value::Object(obj) => match object::get_slot(obj, "value") {
            Some(raw) if raw.is_raw() => raw,
            _ => value,
        },
        _ => value,
    }
}

/// Integer operands stay integral; any float operand promotes the
/// computation to floats. Integer arithmetic wraps on overflow.
fn arith(native: NativeMethod, lhs: Num, rhs: Num, span: Span) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Num::Int(a), Num::Int(b)) => match native {
            NativeMethod::Add => Ok(Value::Int(a.wrapping_add(b))),
            NativeMethod::Sub => Ok(Value::Int(a.wrapping_sub(b))),
            NativeMethod::Mul => Ok(Value::Int(a.wrapping_mul(b))),
            NativeMethod::Div => {
                if b == 0 {
                    Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span))
                } else {
                    Ok(Value::Int(a.wrapping_div(b)))
                }
            }
            NativeMethod::Rem => {
                if b == 0 {
                    Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span))
                } else {
                    Ok(Value::Int(a.wrapping_rem(b)))
                }
            }
            NativeMethod::Lt => Ok(Value::Bool(a < b)),
            NativeMethod::LtEq => Ok(Value::Bool(a <= b)),
            NativeMethod::NumEq => Ok(Value::Bool(a == b)),
            NativeMethod::GtEq => Ok(Value::Bool(a >= b)),
            NativeMethod::Gt => Ok(Value::Bool(a > b)),
            _ => unreachable!("non-arithmetic native routed to arith"),
        },
        (lhs, rhs) => {
            let a = match lhs {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            let b = match rhs {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            match native {
                NativeMethod::Add => Ok(Value::Float(a + b)),
                NativeMethod::Sub => Ok(Value::Float(a - b)),
                NativeMethod::Mul => Ok(Value::Float(a * b)),
                NativeMethod::Div => {
                    if b == 0.0 {
                        Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span))
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                NativeMethod::Rem => {
                    if b == 0.0 {
                        Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span))
                    } else {
                        Ok(Value::Float(a % b))
                    }
                }
                NativeMethod::Lt => Ok(Value::Bool(a < b)),
                NativeMethod::LtEq => Ok(Value::Bool(a <= b)),
                NativeMethod::NumEq => Ok(Value::Bool(a == b)),
                NativeMethod::GtEq => Ok(Value::Bool(a >= b)),
                NativeMethod::Gt => Ok(Value::Bool(a > b)),
                _ => unreachable!("non-arithmetic native routed to arith"),
            }
        }
    }
}
