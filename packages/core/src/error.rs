//! Error types for the management layer.

use std::error::Error as StdError;

use crate::coerce::CoercionError;
use crate::descriptor::Signature;
use crate::name::ManagedName;

/// Boxed error raised by user code behind a getter, setter or operation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while naming, discovering, registering or dispatching.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required naming input is missing or malformed.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A declared member violates a structural rule.
    #[error("invalid metadata on {type_name}.{member}: {message}")]
    InvalidMetadata {
        type_name: String,
        member: String,
        message: String,
    },

    /// A rendered name string could not be parsed.
    #[error("invalid name '{input}': {message}")]
    InvalidName { input: String, message: String },

    /// The name is already bound in the registry.
    #[error("name already registered: {name}")]
    DuplicateName { name: ManagedName },

    /// The name is not bound in the registry.
    #[error("name not registered: {name}")]
    NotRegistered { name: ManagedName },

    /// Attribute is absent, or lacks the requested access.
    #[error("unknown attribute '{attribute}': {reason}")]
    UnknownAttribute { attribute: String, reason: String },

    /// No operation matches the requested name and signature.
    #[error("{}", unknown_operation_message(.operation, .signature, .available))]
    UnknownOperation {
        operation: String,
        signature: Signature,
        /// Signatures registered under the same name, if any.
        available: Vec<Signature>,
    },

    /// More than one overload fits a call that did not name a signature.
    #[error("ambiguous operation '{operation}', candidates: {}", join_signatures(.operation, .candidates))]
    AmbiguousOperation {
        operation: String,
        candidates: Vec<Signature>,
    },

    /// Arguments do not fit the resolved signature.
    #[error("bad arguments for {operation}: {message}")]
    ArgumentMismatch { operation: String, message: String },

    /// User code behind a member raised an error.
    #[error("invocation of {member} failed")]
    Dispatch {
        member: String,
        #[source]
        source: BoxError,
    },

    /// A string could not be converted into a typed value.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The management transport refused a binding.
    #[error("transport failed for {name}")]
    Transport {
        name: ManagedName,
        #[source]
        source: BoxError,
    },

    /// The registry has been stopped.
    #[error("registry is stopped")]
    Stopped,
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_metadata(
        type_name: &str,
        member: &str,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidMetadata {
            type_name: type_name.to_string(),
            member: member.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_attribute(attribute: &str, reason: impl Into<String>) -> Self {
        Error::UnknownAttribute {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Short name of the error kind, for front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "ConfigurationError",
            Error::InvalidMetadata { .. } => "InvalidMetadataError",
            Error::InvalidName { .. } => "InvalidNameError",
            Error::DuplicateName { .. } => "DuplicateNameError",
            Error::NotRegistered { .. } => "NotRegisteredError",
            Error::UnknownAttribute { .. } => "UnknownAttributeError",
            Error::UnknownOperation { .. } | Error::AmbiguousOperation { .. } => {
                "UnknownOperationError"
            }
            Error::ArgumentMismatch { .. } => "ArgumentMismatchError",
            Error::Dispatch { .. } => "DispatchError",
            Error::Coercion(_) => "CoercionError",
            Error::Transport { .. } => "TransportError",
            Error::Stopped => "StoppedError",
        }
    }

    /// True for dispatch-time lookup misses.
    pub fn is_unknown_member(&self) -> bool {
        matches!(
            self,
            Error::UnknownAttribute { .. }
                | Error::UnknownOperation { .. }
                | Error::AmbiguousOperation { .. }
        )
    }

    /// Iterate this error followed by every underlying cause.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }
}

/// Iterator over an error and its `source()` chain.
pub struct Chain<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
}

impl<'a> Chain<'a> {
    pub fn new(err: &'a (dyn StdError + 'static)) -> Self {
        Chain { next: Some(err) }
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

/// Render an error and its causes, one line per cause.
pub fn format_chain(err: &(dyn StdError + 'static)) -> String {
    let mut lines = Vec::new();
    for (i, cause) in Chain::new(err).enumerate() {
        if i == 0 {
            lines.push(cause.to_string());
        } else {
            lines.push(format!("  caused by: {}", cause));
        }
    }
    lines.join("\n")
}

fn unknown_operation_message(
    operation: &str,
    signature: &Signature,
    available: &[Signature],
) -> String {
    if available.is_empty() {
        format!("unknown operation '{}{}'", operation, signature)
    } else {
        format!(
            "no overload {}{} (available: {})",
            operation,
            signature,
            join_signatures(operation, available)
        )
    }
}

fn join_signatures(operation: &str, signatures: &[Signature]) -> String {
    signatures
        .iter()
        .map(|s| format!("{}{}", operation, s))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct Root;

    #[derive(Debug, thiserror::Error)]
    #[error("flush failed")]
    struct Middle(#[source] Root);

    #[test]
    fn unknown_operation_without_overloads() {
        let e = Error::UnknownOperation {
            operation: "reset".to_string(),
            signature: Signature::empty(),
            available: vec![],
        };
        assert_eq!(e.to_string(), "unknown operation 'reset()'");

        let e = Error::UnknownOperation {
            operation: "reset".to_string(),
            signature: Signature::new(vec![TypeTag::Int, TypeTag::Boolean]),
            available: vec![],
        };
        assert_eq!(e.to_string(), "unknown operation 'reset(int, boolean)'");
    }

    #[test]
    fn unknown_operation_lists_overloads() {
        let e = Error::UnknownOperation {
            operation: "add".to_string(),
            signature: Signature::new(vec![TypeTag::Long]),
            available: vec![
                Signature::new(vec![TypeTag::Int]),
                Signature::new(vec![TypeTag::Int, TypeTag::Int]),
            ],
        };
        let display = e.to_string();
        assert!(display.contains("add(long)"));
        assert!(display.contains("add(int)"));
        assert!(display.contains("add(int, int)"));
    }

    #[test]
    fn chain_walks_every_cause_in_order() {
        let e = Error::Dispatch {
            member: "flush()".to_string(),
            source: Box::new(Middle(Root)),
        };
        let messages: Vec<String> = e.chain().map(|c| c.to_string()).collect();
        assert_eq!(
            messages,
            vec!["invocation of flush() failed", "flush failed", "disk full"]
        );
    }

    #[test]
    fn format_chain_one_line_per_cause() {
        let e = Error::Dispatch {
            member: "flush()".to_string(),
            source: Box::new(Middle(Root)),
        };
        let text = format_chain(&e);
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(2).unwrap().contains("caused by: disk full"));
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::Stopped.kind(), "StoppedError");
        assert_eq!(
            Error::configuration("no domain").kind(),
            "ConfigurationError"
        );
        assert!(Error::unknown_attribute("x", "not found").is_unknown_member());
        assert!(!Error::Stopped.is_unknown_member());
    }
}
