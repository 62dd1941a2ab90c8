use std::{fmt, rc::Rc};

use crate::{thenable::Thenable, Error, Promise};

/// Anything a promise can be resolved or rejected with.
///
/// Primitives compare by value, promises and objects by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Error(Rc<Error>),
    Promise(Promise),
    /// A foreign object or function. It takes part in resolution only if its
    /// [`Thenable::then_slot`] yields a callable.
    Object(Rc<dyn Thenable>),
}

impl Value {
    pub fn object(object: impl Thenable + 'static) -> Self {
        Value::Object(Rc::new(object))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Error> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Error(e) => write!(f, "Error({e})"),
            Value::Promise(p) => write!(f, "{p:?}"),
            Value::Object(_) => f.write_str("[object]"),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($(#[$doc:meta])* $t:ty),*) => {
        $($(#[$doc])*
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

number_from!(i32, u32, f32, f64);

number_from!(
    /// Magnitudes above 2^53 round to the nearest `f64`.
    i64,
    /// Magnitudes above 2^53 round to the nearest `f64`.
    u64,
    /// Lengths and counts above 2^53 round to the nearest `f64`.
    usize
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(Rc::new(e))
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

impl From<&Promise> for Value {
    fn from(p: &Promise) -> Self {
        Value::Promise(p.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::{thenable::PlainObject, Error};

    #[test]
    fn test_primitives_compare_by_value() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from("boom"), Value::from(String::from("boom")));
        assert_ne!(Value::Null, Value::Undefined);
        assert_eq!(Value::from(()), Value::Undefined);
        assert_eq!(Value::from(Error::msg("x")), Value::from(Error::msg("x")));
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let a = Value::object(PlainObject);
        let b = Value::object(PlainObject);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_wide_integers_round_past_f64_precision() {
        assert_eq!(Value::from(1i64 << 53).as_number(), Some(9_007_199_254_740_992.0));
        assert_eq!(
            Value::from((1u64 << 53) + 1),
            Value::from(1u64 << 53),
            "2^53 + 1 has no exact f64"
        );
        assert_eq!(Value::from(u32::MAX).as_number(), Some(4_294_967_295.0));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(4usize).as_number(), Some(4.0));
        assert_eq!(Value::from("boom").as_str(), Some("boom"));
        assert_eq!(Value::Null.as_str(), None);
        assert!(Value::default().is_undefined());
        assert_eq!(
            Value::from(Error::SelfResolution).as_error(),
            Some(&Error::SelfResolution)
        );
    }
}
