//! The Value type - typed data moving through get/set/invoke.
//!
//! Every attribute read, attribute write and operation argument is carried
//! as a `Value`. Each variant maps onto one `TypeTag`, with `Null` standing
//! in for "no value" of any type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::coerce::CoercionError;
use crate::types::TypeTag;

/// A typed value read from or written to a managed object.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absence of a value (also the result of void operations).
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Homogeneous array with its declared element type.
    Array { element: TypeTag, items: Vec<Value> },
    /// Opaque object of a named type.
    Object(Object),
}

impl Value {
    /// Build an array value.
    pub fn array(element: TypeTag, items: Vec<Value>) -> Self {
        Value::Array { element, items }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type this value carries, or `None` for `Null`.
    pub fn type_tag(&self) -> Option<TypeTag> {
        let tag = match self {
            Value::Null => return None,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Char(_) => TypeTag::Char,
            Value::Byte(_) => TypeTag::Byte,
            Value::Short(_) => TypeTag::Short,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Array { element, .. } => TypeTag::array(element.clone()),
            Value::Object(o) => TypeTag::Object(o.type_name().to_string()),
        };
        Some(tag)
    }

    /// Whether this value may be passed where `tag` is declared.
    ///
    /// `Null` conforms to every non-void type.
    pub fn conforms_to(&self, tag: &TypeTag) -> bool {
        match self.type_tag() {
            None => !tag.is_void(),
            Some(own) => &own == tag,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any integral value to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen any numeric value to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Human-readable rendering.
    ///
    /// Arrays are rendered element by element for every element kind, so
    /// byte, char and boolean arrays show their contents.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        use std::fmt::Write;

        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            Value::Char(v) => out.push(*v),
            Value::Byte(v) => {
                let _ = write!(out, "{}", v);
            }
            Value::Short(v) => {
                let _ = write!(out, "{}", v);
            }
            Value::Int(v) => {
                let _ = write!(out, "{}", v);
            }
            Value::Long(v) => {
                let _ = write!(out, "{}", v);
            }
            // Debug keeps the fractional part ("1.0", not "1")
            Value::Float(v) => {
                let _ = write!(out, "{:?}", v);
            }
            Value::Double(v) => {
                let _ = write!(out, "{:?}", v);
            }
            Value::String(v) => out.push_str(v),
            Value::Array { items, .. } => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                out.push(']');
            }
            Value::Object(o) => {
                let _ = write!(out, "{}", o);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Array {
                    element: ea,
                    items: ia,
                },
                Value::Array {
                    element: eb,
                    items: ib,
                },
            ) => ea == eb && ia == ib,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Object-safe view of an arbitrary object value.
pub trait ObjectValue: Any + Send + Sync + fmt::Debug + fmt::Display {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + fmt::Debug + fmt::Display> ObjectValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An opaque value of a named type, built by a registered constructor.
#[derive(Clone, Debug)]
pub struct Object {
    type_name: String,
    inner: Arc<dyn ObjectValue>,
}

impl Object {
    pub fn new<T: ObjectValue>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrow the inner value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        // Through the trait object: `Arc<dyn ObjectValue>` is itself an `ObjectValue`.
        ObjectValue::as_any(&*self.inner).downcast_ref::<T>()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && (Arc::ptr_eq(&self.inner, &other.inner)
                || self.inner.to_string() == other.inner.to_string())
    }
}

// Conversion from common types

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    Object => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// Extraction for setter and operation bodies

macro_rules! impl_try_from_value {
    ($($ty:ty => $variant:ident as $tag:expr),* $(,)?) => {
        $(
            impl TryFrom<Value> for $ty {
                type Error = CoercionError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(CoercionError::Mismatch {
                            expected: $tag,
                            found: other.type_tag(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_try_from_value! {
    bool => Bool as TypeTag::Boolean,
    char => Char as TypeTag::Char,
    i8 => Byte as TypeTag::Byte,
    i16 => Short as TypeTag::Short,
    i32 => Int as TypeTag::Int,
    i64 => Long as TypeTag::Long,
    f32 => Float as TypeTag::Float,
    f64 => Double as TypeTag::Double,
    String => String as TypeTag::String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Endpoint(String);

    impl fmt::Display for Endpoint {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "endpoint:{}", self.0)
        }
    }

    #[test]
    fn arrays_render_element_wise() {
        let bytes = Value::array(TypeTag::Byte, vec![Value::Byte(1), Value::Byte(-2)]);
        assert_eq!(bytes.render(), "[1, -2]");

        let chars = Value::array(TypeTag::Char, vec![Value::Char('a'), Value::Char('b')]);
        assert_eq!(chars.render(), "[a, b]");

        let flags = Value::array(TypeTag::Boolean, vec![Value::Bool(true), Value::Bool(false)]);
        assert_eq!(flags.render(), "[true, false]");

        let names = Value::array(TypeTag::String, vec![Value::from("x"), Value::Null]);
        assert_eq!(names.render(), "[x, null]");

        let nested = Value::array(
            TypeTag::array(TypeTag::Int),
            vec![Value::array(TypeTag::Int, vec![Value::Int(1)]), Value::array(TypeTag::Int, vec![])],
        );
        assert_eq!(nested.render(), "[[1], []]");
    }

    #[test]
    fn floats_keep_fraction() {
        assert_eq!(Value::Double(1.0).render(), "1.0");
        assert_eq!(Value::Float(2.5).render(), "2.5");
    }

    #[test]
    fn null_conforms_to_anything_but_void() {
        assert!(Value::Null.conforms_to(&TypeTag::Int));
        assert!(!Value::Null.conforms_to(&TypeTag::Void));
        assert!(Value::Int(1).conforms_to(&TypeTag::Int));
        assert!(!Value::Int(1).conforms_to(&TypeTag::Long));
    }

    #[test]
    fn objects_render_and_downcast() {
        let o = Object::new("Endpoint", Endpoint("db".to_string()));
        let v = Value::from(o.clone());
        assert_eq!(v.render(), "endpoint:db");
        assert_eq!(v.type_tag(), Some(TypeTag::object("Endpoint")));
        assert_eq!(o.downcast_ref::<Endpoint>().unwrap().0, "db");
        assert_eq!(v, Value::Object(Object::new("Endpoint", Endpoint("db".to_string()))));
    }

    #[test]
    fn try_from_reports_mismatch() {
        let n: i32 = Value::Int(7).try_into().unwrap();
        assert_eq!(n, 7);

        let err = i64::try_from(Value::Int(7)).unwrap_err();
        assert!(matches!(
            err,
            CoercionError::Mismatch {
                expected: TypeTag::Long,
                found: Some(TypeTag::Int)
            }
        ));
    }

    #[test]
    fn widening_accessors() {
        assert_eq!(Value::Short(3).as_i64(), Some(3));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::from("x").as_i64(), None);
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
