use crate::runtime::object::{Obj, ObjRef};
use crate::runtime::value::{NativeMethod, Value};

/// Handles to the bootstrap prototypes. Bootstrap runs once per interpreter
/// instance; distinct instances never share a prototype graph.
pub struct Builtins {
    pub object: ObjRef,
    pub number: ObjRef,
    pub boolean: ObjRef,
    pub string: ObjRef,
    /// Canonical empty object, returned by skipped conditionals and broken
    /// loops.
    pub unit: ObjRef,
}

impl Builtins {
    pub fn bootstrap() -> Self {
        let object = Obj::root();
        {
            let mut root = object.borrow_mut();
            root.set_slot("clone", Value::Native(NativeMethod::Clone));
            root.set_slot("print", Value::Native(NativeMethod::Print));
            root.set_slot("==", Value::Native(NativeMethod::IdentityEq));
        }

        let number = Obj::clone_of(&object);
        {
            let mut proto = number.borrow_mut();
            proto.set_slot("+", Value::Native(NativeMethod::Add));
            proto.set_slot("-", Value::Native(NativeMethod::Sub));
            proto.set_slot("*", Value::Native(NativeMethod::Mul));
            proto.set_slot("/", Value::Native(NativeMethod::Div));
            proto.set_slot("%", Value::Native(NativeMethod::Rem));
            proto.set_slot("<", Value::Native(NativeMethod::Lt));
            proto.set_slot("<=", Value::Native(NativeMethod::LtEq));
            proto.set_slot("==", Value::Native(NativeMethod::NumEq));
            proto.set_slot(">=", Value::Native(NativeMethod::GtEq));
            proto.set_slot(">", Value::Native(NativeMethod::Gt));
        }

        let boolean = Obj::clone_of(&object);
        let string = Obj::clone_of(&object);
        string
            .borrow_mut()
            .set_slot("==", Value::Native(NativeMethod::StrEq));

        let unit = Obj::clone_of(&object);

        Self {
            object,
            number,
            boolean,
            string,
            unit,
        }
    }

    pub fn unit_value(&self) -> Value {
        Value::Object(self.unit.clone())
    }

    /// Box a raw payload into a fresh clone of its prototype. `value` holds
    /// the raw; strings also record their `length` in characters.
    pub fn box_raw(&self, raw: &Value) -> Option<ObjRef> {
        match raw {
            Value::Int(_) | Value::Float(_) => {
                let boxed = Obj::clone_of(&self.number);
                boxed.borrow_mut().set_slot("value", raw.clone());
                Some(boxed)
            }
            Value::Bool(_) => {
                let boxed = Obj::clone_of(&self.boolean);
                boxed.borrow_mut().set_slot("value", raw.clone());
                Some(boxed)
            }
            Value::Str(text) => {
                let boxed = Obj::clone_of(&self.string);
                {
                    let mut slots = boxed.borrow_mut();
                    slots.set_slot("value", Value::Str(text.clone()));
                    slots.set_slot("length", Value::Int(text.chars().count() as i64));
                }
                Some(boxed)
            }
            _ => None,
        }
    }

    /// Raws survive past a single send only by being bound somewhere; the
    /// binding sites call this to box them first.
    pub fn box_value(&self, value: Value) -> Value {
        match self.box_raw(&value) {
            Some(boxed) => Value::Object(boxed),
            None => value,
        }
    }
}
