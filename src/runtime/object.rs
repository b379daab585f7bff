use crate::runtime::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a heap object. Objects are reference-counted and freely
/// aliased across slots and bindings; identity is pointer identity.
pub type ObjRef = Rc<RefCell<Obj>>;

/// A prototype-linked object: a single optional prototype reference and an
/// insertion-ordered list of named slots.
pub struct Obj {
    pub proto: Option<ObjRef>,
    slots: Vec<(String, Value)>,
}

impl Obj {
    /// The root object: no prototype, no slots.
    pub fn root() -> ObjRef {
        Rc::new(RefCell::new(Obj {
            proto: None,
            slots: Vec::new(),
        }))
    }

    /// A fresh object whose prototype is `proto`. New objects start with no
    /// own slots; everything else is visible through the chain.
    pub fn clone_of(proto: &ObjRef) -> ObjRef {
        Rc::new(RefCell::new(Obj {
            proto: Some(proto.clone()),
            slots: Vec::new(),
        }))
    }

    pub fn own_slot(&self, name: &str) -> Option<Value> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .map(|(_, value)| value.clone())
    }

    /// Writes always land on this object, never on a prototype.
    pub fn set_slot(&mut self, name: &str, value: Value) {
        if let Some(entry) = self.slots.iter_mut().find(|(slot, _)| slot == name) {
            entry.1 = value;
        } else {
            self.slots.push((name.to_string(), value));
        }
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Slots may alias arbitrary objects; print names only.
        f.debug_struct("Obj")
            .field("slots", &self.slot_names())
            .field("has_proto", &self.proto.is_some())
            .finish()
    }
}

/// Walk `obj` and its prototype chain, returning the first slot hit.
pub fn get_slot(obj: &ObjRef, name: &str) -> Option<Value> {
    let mut current = obj.clone();
    loop {
        if let Some(value) = current.borrow().own_slot(name) {
            return Some(value);
        }
        let next = current.borrow().proto.clone();
        match next {
            Some(proto) => current = proto,
            None => return None,
        }
    }
}

pub fn same_object(a: &ObjRef, b: &ObjRef) -> bool {
    Rc::ptr_eq(a, b)
}
