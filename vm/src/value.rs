//! Runtime values (spec.md §3/§4.7): a tagged variant over the six scalar
//! kinds plus an opaque reference payload. There is no garbage collector
//! (spec.md §1 Non-goals), so reference values are reference-counted handles
//! shared between the stack and any locals/globals that alias them.

use crate::errors::{VmError, VmResult};
use lumen_common::ScalarKind;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The payload behind a `Ref` value: a string or an aggregate used by the
/// array syscalls (spec.md §4.10 family 8).
#[derive(Debug, Clone, PartialEq)]
pub enum RefObject {
    Str(String),
    Array(Vec<Value>),
}

pub type Handle = Rc<RefCell<RefObject>>;

#[derive(Debug, Clone)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Handle),
}

impl Value {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Byte(_) => ScalarKind::Byte,
            Value::Short(_) => ScalarKind::Short,
            Value::Int(_) => ScalarKind::Int,
            Value::Long(_) => ScalarKind::Long,
            Value::Float(_) => ScalarKind::Float,
            Value::Double(_) => ScalarKind::Double,
            Value::Ref(_) => ScalarKind::Ref,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Ref(Rc::new(RefCell::new(RefObject::Str(s.into()))))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Ref(Rc::new(RefCell::new(RefObject::Array(values))))
    }

    pub fn bool(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }

    /// Widen any numeric payload to `i64`, the consumption-time narrowing
    /// rule of spec.md §4.7 ("a consumer asking for L... narrows via its
    /// kind").
    pub fn as_i64(&self) -> VmResult<i64> {
        match self {
            Value::Byte(v) => Ok(*v as i64),
            Value::Short(v) => Ok(*v as i64),
            Value::Int(v) => Ok(*v as i64),
            Value::Long(v) => Ok(*v),
            Value::Float(v) => Ok(*v as i64),
            Value::Double(v) => Ok(*v as i64),
            Value::Ref(_) => Err(VmError::Type { expected: "numeric".to_string(), found: "R".to_string() }),
        }
    }

    pub fn as_f64(&self) -> VmResult<f64> {
        match self {
            Value::Byte(v) => Ok(*v as f64),
            Value::Short(v) => Ok(*v as f64),
            Value::Int(v) => Ok(*v as f64),
            Value::Long(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Ref(_) => Err(VmError::Type { expected: "numeric".to_string(), found: "R".to_string() }),
        }
    }

    pub fn as_handle(&self) -> VmResult<Handle> {
        match self {
            Value::Ref(h) => Ok(h.clone()),
            other => Err(VmError::Type { expected: "R".to_string(), found: other.kind().to_string() }),
        }
    }

    pub fn as_string(&self) -> VmResult<String> {
        let handle = self.as_handle()?;
        match &*handle.borrow() {
            RefObject::Str(s) => Ok(s.clone()),
            RefObject::Array(_) => Err(VmError::Type { expected: "string".to_string(), found: "array".to_string() }),
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.as_i64().map(|v| v != 0).unwrap_or(true)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Ref(h) => match &*h.borrow() {
                RefObject::Str(s) => write!(f, "{s}"),
                RefObject::Array(items) => {
                    write!(f, "[")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    write!(f, "]")
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_consumers_narrow_across_kinds() {
        assert_eq!(Value::Double(3.9).as_i64().unwrap(), 3);
        assert_eq!(Value::Int(7).as_f64().unwrap(), 7.0);
    }

    #[test]
    fn reference_values_are_not_numeric() {
        assert!(Value::string("hi").as_i64().is_err());
    }

    #[test]
    fn falsy_is_exactly_the_integral_zero() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
    }
}
