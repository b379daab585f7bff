use crate::runtime::value::Value;
use std::collections::HashMap;

/// Variable bindings: the root scope plus a stack of method activation
/// frames. Lookup consults the innermost frame (when one is active) and
/// falls through to the root — a method never sees its caller's locals.
#[derive(Default)]
pub struct Environment {
    root: HashMap<String, Value>,
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Bind in the current activation frame, or at the root when evaluation
    /// is at top level. Blocks share the frame of the code around them.
    pub fn bind(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
            }
            None => {
                self.root.insert(name.to_string(), value);
            }
        }
    }

    pub fn bind_root(&mut self, name: &str, value: Value) {
        self.root.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        self.root.get(name).cloned()
    }
}
