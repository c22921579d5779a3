//! Type tags describing attribute, parameter and return types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Semantic type of a managed value.
///
/// Primitive and boxed spellings parse to the same tag, so `int` and
/// `Integer` are one type for coercion and signature matching.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeTag {
    /// No value (operation return type only).
    Void,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    /// Array of the element type.
    Array(Box<TypeTag>),
    /// Any other named type.
    Object(String),
}

impl TypeTag {
    /// Array of `element`.
    pub fn array(element: TypeTag) -> Self {
        TypeTag::Array(Box::new(element))
    }

    /// Named object type.
    pub fn object(name: impl Into<String>) -> Self {
        TypeTag::Object(name.into())
    }

    /// Parse a type string. Never fails: unrecognized names become objects.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            return TypeTag::array(TypeTag::parse(element));
        }
        match s {
            "void" | "Void" | "()" => TypeTag::Void,
            "boolean" | "Boolean" | "bool" => TypeTag::Boolean,
            "char" | "Character" => TypeTag::Char,
            "byte" | "Byte" | "i8" => TypeTag::Byte,
            "short" | "Short" | "i16" => TypeTag::Short,
            "int" | "Integer" | "i32" => TypeTag::Int,
            "long" | "Long" | "i64" => TypeTag::Long,
            "float" | "Float" | "f32" => TypeTag::Float,
            "double" | "Double" | "f64" => TypeTag::Double,
            "String" | "string" | "str" => TypeTag::String,
            other => TypeTag::Object(other.to_string()),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeTag::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeTag::Boolean)
    }

    /// Primitive numeric, boolean or char.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeTag::Boolean
                | TypeTag::Char
                | TypeTag::Byte
                | TypeTag::Short
                | TypeTag::Int
                | TypeTag::Long
                | TypeTag::Float
                | TypeTag::Double
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Void => write!(f, "void"),
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::Char => write!(f, "char"),
            TypeTag::Byte => write!(f, "byte"),
            TypeTag::Short => write!(f, "short"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Long => write!(f, "long"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Double => write!(f, "double"),
            TypeTag::String => write!(f, "String"),
            TypeTag::Array(element) => write!(f, "{}[]", element),
            TypeTag::Object(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for TypeTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TypeTag::parse(s))
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        TypeTag::parse(s)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TypeTag::parse(&s))
    }
}
