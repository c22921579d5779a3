//! String-driven front end over a `Connection`.
//!
//! Callers hand over text; the client looks up member types in cached
//! metadata, coerces the text and makes the typed call. Metadata is cached
//! per object name, so two objects with same-named members never share
//! entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::coerce::TypeRegistry;
use crate::descriptor::{BeanInfo, Signature};
use crate::dispatcher::BatchResult;
use crate::error::Error;
use crate::name::{ManagedName, NamePattern};
use crate::registry::Connection;
use crate::value::Value;

/// A parsed `op` or `op(type, ...)` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRef {
    pub name: String,
    pub signature: Option<Signature>,
}

impl OperationRef {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let text = text.trim();
        let invalid = |message: &str| Error::ArgumentMismatch {
            operation: text.to_string(),
            message: message.to_string(),
        };

        match text.find('(') {
            None => {
                if text.is_empty() {
                    return Err(invalid("operation name is empty"));
                }
                Ok(Self {
                    name: text.to_string(),
                    signature: None,
                })
            }
            Some(open) => {
                if !text.ends_with(')') {
                    return Err(invalid("unterminated parameter list"));
                }
                let name = text[..open].trim();
                if name.is_empty() {
                    return Err(invalid("operation name is empty"));
                }
                Ok(Self {
                    name: name.to_string(),
                    signature: Some(Signature::parse(&text[open..])),
                })
            }
        }
    }
}

pub struct Client<C> {
    connection: C,
    types: Arc<TypeRegistry>,
    cache: Mutex<HashMap<ManagedName, Arc<BeanInfo>>>,
}

impl<C: Connection> Client<C> {
    pub fn new(connection: C, types: Arc<TypeRegistry>) -> Self {
        Self {
            connection,
            types,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn names(&self, pattern: &NamePattern) -> Result<Vec<ManagedName>, Error> {
        self.connection.names(pattern)
    }

    /// Metadata for `name`, fetched once and cached.
    pub fn info(&self, name: &ManagedName) -> Result<Arc<BeanInfo>, Error> {
        if let Some(info) = self.lock().get(name) {
            return Ok(Arc::clone(info));
        }
        let info = Arc::new(self.connection.info(name)?);
        self.lock().insert(name.clone(), Arc::clone(&info));
        Ok(info)
    }

    /// Drop cached metadata for `name` and fetch it again.
    pub fn refresh(&self, name: &ManagedName) -> Result<Arc<BeanInfo>, Error> {
        self.forget(name);
        self.info(name)
    }

    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    pub fn is_cached(&self, name: &ManagedName) -> bool {
        self.lock().contains_key(name)
    }

    fn forget(&self, name: &ManagedName) {
        self.lock().remove(name);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ManagedName, Arc<BeanInfo>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stale metadata is the likely cause of a lookup miss.
    fn observe<T>(&self, name: &ManagedName, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(e) = &result {
            if e.is_unknown_member() {
                self.forget(name);
            }
        }
        result
    }

    pub fn get(&self, name: &ManagedName, attribute: &str) -> Result<Value, Error> {
        let result = self.connection.get_attribute(name, attribute);
        self.observe(name, result)
    }

    pub fn get_many(&self, name: &ManagedName, attributes: &[String]) -> Result<BatchResult<Value>, Error> {
        let results = self.connection.get_attributes(name, attributes)?;
        if results
            .iter()
            .any(|(_, r)| r.as_ref().is_err_and(Error::is_unknown_member))
        {
            self.forget(name);
        }
        Ok(results)
    }

    /// Set an attribute from text, coerced to the attribute's declared type.
    pub fn set(&self, name: &ManagedName, attribute: &str, text: &str) -> Result<(), Error> {
        let info = self.info(name)?;
        let Some(declared) = info.attribute(attribute) else {
            self.forget(name);
            return Err(Error::unknown_attribute(attribute, "not found"));
        };
        let value = self.types.coerce(&declared.type_tag, text)?;
        let result = self.connection.set_attribute(name, attribute, value);
        self.observe(name, result)
    }

    /// Invoke `op` or `op(type, ...)` with text arguments.
    ///
    /// Without explicit types the overload is the unique one taking
    /// `args.len()` parameters.
    pub fn invoke(&self, name: &ManagedName, operation: &str, args: &[&str]) -> Result<Value, Error> {
        let op = OperationRef::parse(operation)?;
        let signature = match op.signature {
            Some(signature) => signature,
            None => self.resolve(name, &op.name, args.len())?,
        };

        if signature.len() != args.len() {
            return Err(Error::ArgumentMismatch {
                operation: format!("{}{}", op.name, signature),
                message: format!("expected {} arguments, got {}", signature.len(), args.len()),
            });
        }

        let values = signature
            .types()
            .iter()
            .zip(args)
            .map(|(tag, text)| self.types.coerce(tag, text))
            .collect::<Result<Vec<_>, _>>()?;

        let result = self.connection.invoke(name, &op.name, &values, &signature);
        self.observe(name, result)
    }

    fn resolve(&self, name: &ManagedName, operation: &str, arity: usize) -> Result<Signature, Error> {
        let info = self.info(name)?;
        let overloads: Vec<Signature> = info.overloads(operation).map(|o| o.signature.clone()).collect();
        if overloads.is_empty() {
            self.forget(name);
            return Err(Error::UnknownOperation {
                operation: operation.to_string(),
                signature: Signature::empty(),
                available: Vec::new(),
            });
        }

        let mut fitting: Vec<Signature> = overloads.iter().filter(|s| s.len() == arity).cloned().collect();
        match fitting.len() {
            1 => Ok(fitting.remove(0)),
            0 => Err(Error::ArgumentMismatch {
                operation: operation.to_string(),
                message: format!(
                    "no overload takes {} arguments (available: {})",
                    arity,
                    overloads
                        .iter()
                        .map(|s| format!("{}{}", operation, s))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
            _ => Err(Error::AmbiguousOperation {
                operation: operation.to_string(),
                candidates: fitting,
            }),
        }
    }
}

impl<C> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.lock().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("Client").field("cached", &cached).finish()
    }
}
