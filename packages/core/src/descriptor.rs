//! Bound attribute and operation descriptors, plus their handle-free info.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BoxError;
use crate::name::ManagedName;
use crate::types::TypeTag;
use crate::value::Value;

/// Reads an attribute from the bound target.
pub type BoundGetter = Arc<dyn Fn() -> Result<Value, BoxError> + Send + Sync>;
/// Writes an attribute on the bound target.
pub type BoundSetter = Arc<dyn Fn(Value) -> Result<(), BoxError> + Send + Sync>;
/// Invokes an operation on the bound target.
pub type BoundInvoker = Arc<dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Ordered parameter types of an operation.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub Vec<TypeTag>);

impl Signature {
    pub fn new(types: Vec<TypeTag>) -> Self {
        Signature(types)
    }

    pub fn empty() -> Self {
        Signature(Vec::new())
    }

    /// Parse `"int, String"` (parentheses optional).
    pub fn parse(s: &str) -> Self {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(s)
            .trim();
        if inner.is_empty() {
            return Signature::empty();
        }
        Signature(inner.split(',').map(TypeTag::parse).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn types(&self) -> &[TypeTag] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<TypeTag>> for Signature {
    fn from(types: Vec<TypeTag>) -> Self {
        Signature(types)
    }
}

impl<const N: usize> From<[TypeTag; N]> for Signature {
    fn from(types: [TypeTag; N]) -> Self {
        Signature(types.into())
    }
}

/// Dispatch key for an operation.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperationKey {
    pub name: String,
    pub signature: Signature,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

/// An attribute bound to one target.
#[derive(Clone)]
pub struct AttributeDescriptor {
    pub name: String,
    pub description: String,
    pub type_tag: TypeTag,
    pub getter: Option<BoundGetter>,
    pub setter: Option<BoundSetter>,
}

impl AttributeDescriptor {
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn info(&self) -> AttributeInfo {
        AttributeInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            type_tag: self.type_tag.clone(),
            readable: self.is_readable(),
            writable: self.is_writable(),
        }
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// An operation bound to one target.
#[derive(Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub signature: Signature,
    pub parameter_names: Vec<String>,
    pub return_type: TypeTag,
    pub invoker: BoundInvoker,
}

impl OperationDescriptor {
    pub fn key(&self) -> OperationKey {
        OperationKey {
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }

    pub fn info(&self) -> OperationInfo {
        OperationInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            signature: self.signature.clone(),
            parameter_names: self.parameter_names.clone(),
            return_type: self.return_type.clone(),
        }
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// Attribute metadata without handles, as seen by clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub readable: bool,
    pub writable: bool,
}

/// Operation metadata without handles, as seen by clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    pub signature: Signature,
    #[serde(default)]
    pub parameter_names: Vec<String>,
    pub return_type: TypeTag,
}

/// Everything a client needs to know about one registered object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeanInfo {
    pub name: ManagedName,
    pub type_name: String,
    pub attributes: Vec<AttributeInfo>,
    pub operations: Vec<OperationInfo>,
}

impl BeanInfo {
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// All overloads of an operation.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a OperationInfo> + 'a {
        self.operations.iter().filter(move |o| o.name == name)
    }
}
