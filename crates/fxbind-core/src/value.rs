//! Dynamic values flowing through expressions and properties.
//!
//! Scalars compare by value. `Object` and `Property` compare by identity:
//! two handles are equal only when they refer to the same shared state.

use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;
use crate::property::PropertyRef;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(ObjectRef),
    Property(PropertyRef),
}

impl Value {
    /// Wrap a host object.
    #[must_use]
    pub fn object(object: ObjectRef) -> Self {
        Self::Object(object)
    }

    /// Wrap an observable property.
    #[must_use]
    pub fn property(property: PropertyRef) -> Self {
        Self::Property(property)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Property(_) => "property",
        }
    }

    /// Human-readable description of the value's type, including the host
    /// type name for objects.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Object(obj) => obj.type_name().to_string(),
            other => other.type_name().to_string(),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyRef> {
        match self {
            Self::Property(p) => Some(p),
            _ => None,
        }
    }

    /// Unwrap one level of property indirection.
    ///
    /// A `Property` yields its current value; anything else is returned as
    /// is. Not recursive: a property whose value is itself a property is
    /// unwrapped once.
    #[must_use]
    pub fn resolved(&self) -> Value {
        match self {
            Self::Property(p) => p.value(),
            other => other.clone(),
        }
    }
}

fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => same_object(a, b),
            (Self::Property(a), Self::Property(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Object(obj) => write!(f, "Object({})", obj.type_name()),
            Self::Property(p) => match p.name() {
                Some(name) => write!(f, "Property({name})"),
                None => f.write_str("Property(<anonymous>)"),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Object(obj) => write!(f, "<{}>", obj.type_name()),
            Self::Property(p) => write!(f, "{}", p.value()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

impl From<PropertyRef> for Value {
    fn from(p: PropertyRef) -> Self {
        Self::Property(p)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::SimpleProperty;

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn properties_compare_by_identity() {
        let p = SimpleProperty::new(1);
        let a = Value::Property(p.to_property_ref());
        let b = Value::Property(p.to_property_ref());
        let other = Value::Property(SimpleProperty::new(1).to_property_ref());
        assert_eq!(a, b);
        assert_ne!(a, other);
    }

    #[test]
    fn resolved_unwraps_one_level() {
        let inner = SimpleProperty::new(7);
        let outer = SimpleProperty::new(Value::Property(inner.to_property_ref()));
        let v = Value::Property(outer.to_property_ref());
        let once = v.resolved();
        assert!(matches!(once, Value::Property(_)));
        assert_eq!(once.resolved(), Value::Int(7));
    }

    #[test]
    fn float_view_widens_ints() {
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::from("x").as_float(), None);
    }

    #[test]
    fn debug_and_display() {
        assert_eq!(format!("{:?}", Value::from("hi")), "Str(\"hi\")");
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
