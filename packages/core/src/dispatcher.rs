//! Per-object dispatch of get, set and invoke calls.
//!
//! A `Dispatcher` owns the descriptors discovered for one target, each
//! bound to that target. The descriptor maps never change after binding;
//! calls run user code directly on the target without locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coerce::{CoercionError, TypeRegistry};
use crate::descriptor::{
    AttributeDescriptor, BeanInfo, BoundGetter, BoundInvoker, BoundSetter, OperationDescriptor,
    OperationKey, Signature,
};
use crate::error::Error;
use crate::name::ManagedName;
use crate::shape::{AttributeDecl, Members, OperationDecl};
use crate::types::TypeTag;
use crate::value::Value;

/// Outcome of one item in a batch call, keyed by attribute name.
pub type BatchResult<T> = Vec<(String, Result<T, Error>)>;

pub struct Dispatcher {
    name: ManagedName,
    type_name: String,
    types: Arc<TypeRegistry>,
    attributes: BTreeMap<String, AttributeDescriptor>,
    operations: BTreeMap<OperationKey, OperationDescriptor>,
}

impl Dispatcher {
    /// Bind discovered members to `target`.
    pub fn bind<T: Send + Sync + 'static>(
        name: ManagedName,
        type_name: impl Into<String>,
        target: Arc<T>,
        members: Members<T>,
        types: Arc<TypeRegistry>,
    ) -> Self {
        let attributes = members
            .attributes
            .into_iter()
            .map(|decl| {
                let descriptor = bind_attribute(&target, decl);
                (descriptor.name.clone(), descriptor)
            })
            .collect();

        let operations = members
            .operations
            .into_iter()
            .map(|decl| {
                let descriptor = bind_operation(&target, decl);
                (descriptor.key(), descriptor)
            })
            .collect();

        Self {
            name,
            type_name: type_name.into(),
            types,
            attributes,
            operations,
        }
    }

    pub fn name(&self) -> &ManagedName {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.values()
    }

    /// Signatures registered under an operation name.
    pub fn overloads(&self, operation: &str) -> Vec<Signature> {
        self.operations
            .values()
            .filter(|op| op.name == operation)
            .map(|op| op.signature.clone())
            .collect()
    }

    pub fn info(&self) -> BeanInfo {
        BeanInfo {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            attributes: self.attributes.values().map(AttributeDescriptor::info).collect(),
            operations: self.operations.values().map(OperationDescriptor::info).collect(),
        }
    }

    pub fn get_attribute(&self, attribute: &str) -> Result<Value, Error> {
        let descriptor = self
            .attributes
            .get(attribute)
            .ok_or_else(|| Error::unknown_attribute(attribute, "not found"))?;
        let getter = descriptor
            .getter
            .as_ref()
            .ok_or_else(|| Error::unknown_attribute(attribute, "not readable"))?;

        getter().map_err(|source| self.dispatch_failed(attribute, source))
    }

    /// Set an attribute. A string value is coerced to the declared type.
    pub fn set_attribute(&self, attribute: &str, value: Value) -> Result<(), Error> {
        let descriptor = self
            .attributes
            .get(attribute)
            .ok_or_else(|| Error::unknown_attribute(attribute, "not found"))?;
        let setter = descriptor
            .setter
            .as_ref()
            .ok_or_else(|| Error::unknown_attribute(attribute, "not writable"))?;

        let value = match value {
            Value::String(text) if descriptor.type_tag != TypeTag::String => {
                self.types.coerce(&descriptor.type_tag, &text)?
            }
            other => other,
        };
        if !value.conforms_to(&descriptor.type_tag) {
            return Err(CoercionError::Mismatch {
                expected: descriptor.type_tag.clone(),
                found: value.type_tag(),
            }
            .into());
        }

        setter(value).map_err(|source| self.dispatch_failed(attribute, source))
    }

    /// Read several attributes; each failure is reported for its own item.
    pub fn get_attributes<S: AsRef<str>>(&self, attributes: &[S]) -> BatchResult<Value> {
        attributes
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), self.get_attribute(name))
            })
            .collect()
    }

    /// Write several attributes; each failure is reported for its own item.
    pub fn set_attributes(&self, values: Vec<(String, Value)>) -> BatchResult<()> {
        values
            .into_iter()
            .map(|(name, value)| {
                let result = self.set_attribute(&name, value);
                (name, result)
            })
            .collect()
    }

    /// Invoke the operation registered under exactly `(operation, signature)`.
    pub fn invoke(
        &self,
        operation: &str,
        args: &[Value],
        signature: &Signature,
    ) -> Result<Value, Error> {
        let key = OperationKey {
            name: operation.to_string(),
            signature: signature.clone(),
        };
        let descriptor = self.operations.get(&key).ok_or_else(|| Error::UnknownOperation {
            operation: operation.to_string(),
            signature: signature.clone(),
            available: self.overloads(operation),
        })?;

        if args.len() != signature.len() {
            return Err(Error::ArgumentMismatch {
                operation: key.to_string(),
                message: format!("expected {} arguments, got {}", signature.len(), args.len()),
            });
        }
        for (i, (arg, tag)) in args.iter().zip(signature.types()).enumerate() {
            if !arg.conforms_to(tag) {
                let found = arg
                    .type_tag()
                    .map_or_else(|| "null".to_string(), |t| t.to_string());
                return Err(Error::ArgumentMismatch {
                    operation: key.to_string(),
                    message: format!("argument {} expects {}, found {}", i, tag, found),
                });
            }
        }

        (descriptor.invoker)(args).map_err(|source| self.dispatch_failed(&key.to_string(), source))
    }

    fn dispatch_failed(&self, member: &str, source: crate::error::BoxError) -> Error {
        tracing::debug!(name = %self.name, member, error = %source, "dispatch failed");
        Error::Dispatch {
            member: member.to_string(),
            source,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field(
                "operations",
                &self.operations.keys().map(ToString::to_string).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn bind_attribute<T: Send + Sync + 'static>(
    target: &Arc<T>,
    decl: AttributeDecl<T>,
) -> AttributeDescriptor {
    let getter = decl.read.map(|read| -> BoundGetter {
        let target = Arc::clone(target);
        Arc::new(move || read(&target))
    });
    let setter = decl.write.map(|write| -> BoundSetter {
        let target = Arc::clone(target);
        Arc::new(move |value| write(&target, value))
    });

    AttributeDescriptor {
        name: decl.name,
        description: decl.description,
        type_tag: decl.type_tag,
        getter,
        setter,
    }
}

fn bind_operation<T: Send + Sync + 'static>(
    target: &Arc<T>,
    decl: OperationDecl<T>,
) -> OperationDescriptor {
    let body = decl.body;
    let bound = Arc::clone(target);
    let invoker: BoundInvoker = Arc::new(move |args| body(&bound, args));

    OperationDescriptor {
        name: decl.name,
        description: decl.description,
        signature: decl.signature,
        parameter_names: decl.parameter_names,
        return_type: decl.return_type,
        invoker,
    }
}
