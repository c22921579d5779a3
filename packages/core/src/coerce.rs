//! String-to-value coercion.
//!
//! Front ends deliver arguments as text. `TypeRegistry::coerce` turns text
//! into a `Value` of a declared `TypeTag`: primitives and strings are parsed
//! directly, arrays split on commas, and object types go through a
//! registered single-string constructor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::BoxError;
use crate::types::TypeTag;
use crate::value::{Object, Value};

/// Builds an object of a named type from a single string.
pub type Constructor = Arc<dyn Fn(&str) -> Result<Object, BoxError> + Send + Sync>;

/// Errors converting text into typed values.
#[derive(thiserror::Error, Debug)]
pub enum CoercionError {
    /// The type name is not known at all.
    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },

    /// The type is known but cannot be built from a string.
    #[error("type '{type_name}' has no string constructor")]
    NoStringConstructor { type_name: String },

    /// The string constructor rejected its input.
    #[error("constructing {type_name} from '{input}' failed")]
    ConstructorFailed {
        type_name: String,
        input: String,
        #[source]
        source: BoxError,
    },

    /// The text is not a valid literal of the type.
    #[error("cannot parse '{input}' as {type_tag}: {message}")]
    Parse {
        type_tag: TypeTag,
        input: String,
        message: String,
    },

    /// A value of one type was supplied where another was expected.
    #[error("expected {expected}, found {}", describe_found(.found))]
    Mismatch {
        expected: TypeTag,
        found: Option<TypeTag>,
    },
}

fn describe_found(found: &Option<TypeTag>) -> String {
    match found {
        Some(tag) => tag.to_string(),
        None => "null".to_string(),
    }
}

/// Known object types and their string constructors.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Option<Constructor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a type that exists but has no string constructor.
    pub fn declare(&self, type_name: impl Into<String>) {
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.entry(type_name.into()).or_insert(None);
    }

    /// Register a single-string constructor for a type.
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> Result<Object, BoxError> + Send + Sync + 'static,
    {
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.insert(type_name.into(), Some(Arc::new(constructor)));
    }

    pub fn is_known(&self, type_name: &str) -> bool {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.contains_key(type_name)
    }

    /// Coerce text into a value of a type string.
    pub fn coerce_str(&self, type_name: &str, text: &str) -> Result<Value, CoercionError> {
        self.coerce(&TypeTag::parse(type_name), text)
    }

    /// Coerce text into a value of `tag`.
    pub fn coerce(&self, tag: &TypeTag, text: &str) -> Result<Value, CoercionError> {
        match tag {
            TypeTag::Void => Err(parse_error(tag, text, "void has no values")),
            TypeTag::Boolean => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(parse_error(tag, text, "expected true or false"))
                }
            }
            // Empty text is the null character
            TypeTag::Char => Ok(Value::Char(text.chars().next().unwrap_or('\0'))),
            TypeTag::Byte => parse_number(tag, text).map(Value::Byte),
            TypeTag::Short => parse_number(tag, text).map(Value::Short),
            TypeTag::Int => parse_number(tag, text).map(Value::Int),
            TypeTag::Long => parse_number(tag, text).map(Value::Long),
            TypeTag::Float => parse_number(tag, text).map(Value::Float),
            TypeTag::Double => parse_number(tag, text).map(Value::Double),
            TypeTag::String => Ok(Value::String(text.to_string())),
            TypeTag::Array(element) => {
                let items = if text.trim().is_empty() {
                    Vec::new()
                } else {
                    text.split(',')
                        .map(|part| self.coerce(element, part.trim()))
                        .collect::<Result<Vec<_>, _>>()?
                };
                Ok(Value::array((**element).clone(), items))
            }
            TypeTag::Object(type_name) => self.construct(type_name, text),
        }
    }

    fn construct(&self, type_name: &str, text: &str) -> Result<Value, CoercionError> {
        let constructor = {
            let types = self.types.read().unwrap_or_else(|e| e.into_inner());
            match types.get(type_name) {
                None => {
                    return Err(CoercionError::UnknownType {
                        type_name: type_name.to_string(),
                    })
                }
                Some(None) => {
                    return Err(CoercionError::NoStringConstructor {
                        type_name: type_name.to_string(),
                    })
                }
                Some(Some(ctor)) => Arc::clone(ctor),
            }
        };

        constructor(text)
            .map(Value::Object)
            .map_err(|source| CoercionError::ConstructorFailed {
                type_name: type_name.to_string(),
                input: text.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<&String> = types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

fn parse_number<N>(tag: &TypeTag, text: &str) -> Result<N, CoercionError>
where
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    text.trim()
        .parse::<N>()
        .map_err(|e| parse_error(tag, text, e.to_string()))
}

fn parse_error(tag: &TypeTag, text: &str, message: impl Into<String>) -> CoercionError {
    CoercionError::Parse {
        type_tag: tag.clone(),
        input: text.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct Port(u16);

    impl fmt::Display for Port {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, ":{}", self.0)
        }
    }

    fn registry() -> TypeRegistry {
        let types = TypeRegistry::new();
        types.register("Port", |s: &str| {
            let n: u16 = s.parse()?;
            Ok(Object::new("Port", Port(n)))
        });
        types.declare("Socket");
        types
    }

    #[test]
    fn primitives_from_boxed_and_primitive_names() {
        let types = TypeRegistry::new();
        assert_eq!(types.coerce_str("boolean", "true").unwrap(), Value::Bool(true));
        assert_eq!(types.coerce_str("Boolean", "FALSE").unwrap(), Value::Bool(false));
        assert_eq!(types.coerce_str("byte", "-7").unwrap(), Value::Byte(-7));
        assert_eq!(types.coerce_str("Short", "300").unwrap(), Value::Short(300));
        assert_eq!(types.coerce_str("Integer", "42").unwrap(), Value::Int(42));
        assert_eq!(types.coerce_str("long", "9000000000").unwrap(), Value::Long(9_000_000_000));
        assert_eq!(types.coerce_str("float", "1.5").unwrap(), Value::Float(1.5));
        assert_eq!(types.coerce_str("Double", "2.25").unwrap(), Value::Double(2.25));
        assert_eq!(types.coerce_str("String", "hi there").unwrap(), Value::from("hi there"));
    }

    #[test]
    fn empty_char_is_null_character() {
        let types = TypeRegistry::new();
        assert_eq!(types.coerce_str("char", "").unwrap(), Value::Char('\0'));
        assert_eq!(types.coerce_str("Character", "xyz").unwrap(), Value::Char('x'));
    }

    #[test]
    fn bad_numbers_are_parse_errors() {
        let types = TypeRegistry::new();
        let err = types.coerce_str("int", "forty").unwrap_err();
        assert!(matches!(err, CoercionError::Parse { .. }));
        assert!(err.to_string().contains("forty"));

        let err = types.coerce_str("byte", "300").unwrap_err();
        assert!(matches!(err, CoercionError::Parse { .. }));

        let err = types.coerce_str("boolean", "yes").unwrap_err();
        assert!(matches!(err, CoercionError::Parse { .. }));
    }

    #[test]
    fn arrays_split_on_commas() {
        let types = TypeRegistry::new();
        let v = types.coerce_str("int[]", "1, 2,3").unwrap();
        assert_eq!(
            v,
            Value::array(TypeTag::Int, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            types.coerce_str("String[]", "").unwrap(),
            Value::array(TypeTag::String, vec![])
        );
    }

    #[test]
    fn objects_use_string_constructor() {
        let types = registry();
        let v = types.coerce_str("Port", "8080").unwrap();
        assert_eq!(v.render(), ":8080");
        assert_eq!(v.as_object().unwrap().downcast_ref::<Port>().unwrap().0, 8080);
    }

    #[test]
    fn unknown_type_is_descriptive() {
        let types = registry();
        let err = types.coerce_str("Widget", "x").unwrap_err();
        assert_eq!(err.to_string(), "unknown type 'Widget'");

        let err = types.coerce_str("Socket", "x").unwrap_err();
        assert_eq!(err.to_string(), "type 'Socket' has no string constructor");
    }

    #[test]
    fn constructor_failure_keeps_cause() {
        let types = registry();
        let err = types.coerce_str("Port", "not-a-port").unwrap_err();
        assert!(matches!(err, CoercionError::ConstructorFailed { .. }));
        assert!(err.source().is_some());
    }
}
