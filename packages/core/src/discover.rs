//! Discovery: turning declared members into attribute and operation sets.
//!
//! Three mutually exclusive strategies produce a `Members<T>`:
//!
//! - [`annotated`] scans a `TypeShape` for attribute and operation markers
//!   and rejects structurally invalid members.
//! - [`self_described`] takes the members a `SelfDescribing` target lists
//!   for itself.
//! - [`explicit`] takes caller-supplied fields, accessor methods and
//!   operations; [`Explicit::all_public`] fills those from every public
//!   member of a shape and degrades gracefully on malformed members.
//!
//! Getters and setters pair by logical name: `getFoo`/`setFoo` become one
//! attribute `foo`. Operations are keyed by name and parameter types, so
//! overloads coexist.

use std::collections::{HashMap, HashSet};

use crate::descriptor::OperationKey;
use crate::error::Error;
use crate::name::{NameSpec, SelfNaming};
use crate::shape::{
    AttributeDecl, AttributeMarker, FieldDecl, Getter, Marker, Members, MethodDecl,
    OperationDecl, Setter, TypeShape,
};
use crate::types::TypeTag;
use crate::value::Value;

/// Method names never published by [`Explicit::all_public`].
pub const EXCLUDED_METHODS: [&str; 7] = [
    "getClass",
    "wait",
    "equals",
    "toString",
    "hashCode",
    "notify",
    "notifyAll",
];

/// A type whose members are declared with markers on its shape.
pub trait Managed: Send + Sync + Sized + 'static {
    /// Declared members and naming of this type.
    fn shape() -> TypeShape<Self>;

    /// Name overrides supplied by the instance itself.
    fn self_naming(&self) -> Option<&dyn SelfNaming> {
        None
    }
}

/// A type that lists its own attributes and operations.
pub trait SelfDescribing: Send + Sync + Sized + 'static {
    fn naming(&self) -> NameSpec;

    fn describe(&self) -> Members<Self>;

    fn self_naming(&self) -> Option<&dyn SelfNaming> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strictness {
    /// Structural violations fail discovery.
    Strict,
    /// Structural violations are logged and the member skipped.
    Lenient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AccessorKind {
    Get,
    Set,
}

/// How an accessor-named method fits the getter/setter rules.
struct Accessor {
    kind: AccessorKind,
    attribute: String,
}

/// Split `getFoo`/`setFoo` (and `isFoo` when allowed) into kind and
/// logical name. `None` when the name has no accessor prefix.
fn accessor_name(name: &str, allow_is: bool) -> Option<(AccessorKind, &'static str, String)> {
    let candidates: &[(&'static str, AccessorKind)] = if allow_is {
        &[("get", AccessorKind::Get), ("set", AccessorKind::Set), ("is", AccessorKind::Get)]
    } else {
        &[("get", AccessorKind::Get), ("set", AccessorKind::Set)]
    };
    for &(prefix, kind) in candidates {
        if let Some(suffix) = name.strip_prefix(prefix) {
            if !suffix.is_empty() {
                return Some((kind, prefix, decapitalize(suffix)));
            }
        }
    }
    None
}

/// Lower-case the first character.
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Check a method against the getter/setter rules.
fn classify_accessor<T>(method: &MethodDecl<T>, allow_is: bool) -> Result<Accessor, String> {
    let (kind, prefix, attribute) = accessor_name(&method.name, allow_is).ok_or_else(|| {
        if allow_is {
            "attribute method must be named getX, isX or setX".to_string()
        } else {
            "attribute method must be named getX or setX".to_string()
        }
    })?;

    match kind {
        AccessorKind::Get => {
            if !method.params.is_empty() {
                return Err(format!(
                    "getter must take no parameters, takes {}",
                    method.params.len()
                ));
            }
            if method.returns.is_void() {
                return Err("getter must return a value".to_string());
            }
            if prefix == "is" && !method.returns.is_boolean() {
                return Err("isX getter must return boolean".to_string());
            }
        }
        AccessorKind::Set => {
            if method.params.len() != 1 {
                return Err(format!(
                    "setter must take exactly one parameter, takes {}",
                    method.params.len()
                ));
            }
            if !method.returns.is_void() {
                return Err("setter must return void".to_string());
            }
        }
    }

    Ok(Accessor { kind, attribute })
}

fn getter_from_method<T: 'static>(method: &MethodDecl<T>) -> Getter<T> {
    let body = method.body.clone();
    std::sync::Arc::new(move |target: &T| body(target, &[]))
}

fn setter_from_method<T: 'static>(method: &MethodDecl<T>) -> Setter<T> {
    let body = method.body.clone();
    std::sync::Arc::new(move |target: &T, value: Value| {
        body(target, std::slice::from_ref(&value))?;
        Ok(())
    })
}

/// Attribute under construction.
struct PendingAttribute<T> {
    description: String,
    from_field: bool,
    getter: Option<(String, TypeTag, Getter<T>)>,
    setter: Option<(String, TypeTag, Setter<T>)>,
}

/// Collects attributes in declaration order, pairing accessors.
struct AttributeSet<'a, T> {
    type_name: &'a str,
    strictness: Strictness,
    order: Vec<String>,
    pending: HashMap<String, PendingAttribute<T>>,
}

impl<'a, T: 'static> AttributeSet<'a, T> {
    fn new(type_name: &'a str, strictness: Strictness) -> Self {
        Self {
            type_name,
            strictness,
            order: Vec::new(),
            pending: HashMap::new(),
        }
    }

    /// Fail in strict mode, warn and skip in lenient mode.
    fn reject(&self, member: &str, message: String) -> Result<(), Error> {
        match self.strictness {
            Strictness::Strict => Err(Error::invalid_metadata(self.type_name, member, message)),
            Strictness::Lenient => {
                tracing::warn!(
                    type_name = self.type_name,
                    member,
                    reason = %message,
                    "skipping member"
                );
                Ok(())
            }
        }
    }

    fn add_field(
        &mut self,
        field: &FieldDecl<T>,
        readable: bool,
        writable: bool,
        description: &str,
    ) -> Result<(), Error> {
        if !readable && !writable {
            return self.reject(&field.name, "attribute is neither readable nor writable".into());
        }
        if writable && field.constant {
            return self.reject(&field.name, "constant field cannot be writable".into());
        }
        if writable && field.write.is_none() {
            return self.reject(&field.name, "field is marked writable but has no write access".into());
        }
        if self.pending.contains_key(&field.name) {
            return self.reject(&field.name, format!("attribute '{}' declared twice", field.name));
        }

        let attribute = PendingAttribute {
            description: description.to_string(),
            from_field: true,
            getter: readable.then(|| (field.name.clone(), field.type_tag.clone(), field.read.clone())),
            setter: if writable {
                field
                    .write
                    .clone()
                    .map(|w| (field.name.clone(), field.type_tag.clone(), w))
            } else {
                None
            },
        };
        self.order.push(field.name.clone());
        self.pending.insert(field.name.clone(), attribute);
        Ok(())
    }

    fn add_accessor(
        &mut self,
        method: &MethodDecl<T>,
        accessor: Accessor,
        description: &str,
    ) -> Result<(), Error> {
        let name = accessor.attribute;

        if let Some(existing) = self.pending.get(&name) {
            if existing.from_field {
                return self.reject(&method.name, format!("attribute '{}' declared twice", name));
            }
            let taken = match accessor.kind {
                AccessorKind::Get => existing.getter.as_ref().map(|g| g.0.clone()),
                AccessorKind::Set => existing.setter.as_ref().map(|s| s.0.clone()),
            };
            if let Some(other) = taken {
                return self.reject(
                    &method.name,
                    format!("attribute '{}' already has accessor {}", name, other),
                );
            }
        } else {
            self.order.push(name.clone());
            self.pending.insert(
                name.clone(),
                PendingAttribute {
                    description: String::new(),
                    from_field: false,
                    getter: None,
                    setter: None,
                },
            );
        }

        let Some(entry) = self.pending.get_mut(&name) else {
            return Ok(());
        };
        match accessor.kind {
            AccessorKind::Get => {
                entry.getter = Some((
                    method.name.clone(),
                    method.returns.clone(),
                    getter_from_method(method),
                ));
                // Getter description wins over setter description
                if !description.is_empty() {
                    entry.description = description.to_string();
                }
            }
            AccessorKind::Set => {
                let param = method.params.types()[0].clone();
                entry.setter = Some((method.name.clone(), param, setter_from_method(method)));
                if entry.description.is_empty() {
                    entry.description = description.to_string();
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<AttributeDecl<T>>, Error> {
        let mut attributes = Vec::with_capacity(self.order.len());
        let order = std::mem::take(&mut self.order);

        for name in order {
            let Some(mut pending) = self.pending.remove(&name) else {
                continue;
            };

            let mismatch = match (&pending.getter, &pending.setter) {
                (Some((getter, read_type, _)), Some((setter, write_type, _)))
                    if read_type != write_type =>
                {
                    Some((
                        setter.clone(),
                        format!(
                            "{} returns {} but {} takes {}",
                            getter, read_type, setter, write_type
                        ),
                    ))
                }
                _ => None,
            };
            if let Some((setter, message)) = mismatch {
                self.reject(&setter, message)?;
                pending.setter = None;
            }

            let type_tag = match (&pending.getter, &pending.setter) {
                (Some((_, tag, _)), _) | (None, Some((_, tag, _))) => tag.clone(),
                (None, None) => continue,
            };

            attributes.push(AttributeDecl {
                name,
                description: pending.description,
                type_tag,
                read: pending.getter.map(|(_, _, g)| g),
                write: pending.setter.map(|(_, _, s)| s),
            });
        }

        Ok(attributes)
    }
}

/// Collects operations keyed by (name, signature).
struct OperationSet<'a, T> {
    type_name: &'a str,
    keys: HashSet<OperationKey>,
    operations: Vec<OperationDecl<T>>,
}

impl<'a, T: 'static> OperationSet<'a, T> {
    fn new(type_name: &'a str) -> Self {
        Self {
            type_name,
            keys: HashSet::new(),
            operations: Vec::new(),
        }
    }

    fn add(&mut self, operation: OperationDecl<T>) -> Result<(), Error> {
        check_operation(self.type_name, &operation)?;
        let key = OperationKey {
            name: operation.name.clone(),
            signature: operation.signature.clone(),
        };
        if !self.keys.insert(key.clone()) {
            return Err(Error::invalid_metadata(
                self.type_name,
                &key.to_string(),
                "operation declared twice with the same signature",
            ));
        }
        self.operations.push(operation);
        Ok(())
    }
}

fn check_operation<T>(type_name: &str, operation: &OperationDecl<T>) -> Result<(), Error> {
    if operation.name.is_empty() {
        return Err(Error::invalid_metadata(type_name, "<unnamed>", "operation has no name"));
    }
    if !operation.parameter_names.is_empty()
        && operation.parameter_names.len() != operation.signature.len()
    {
        return Err(Error::invalid_metadata(
            type_name,
            &operation.name,
            format!(
                "{} parameter names for {} parameters",
                operation.parameter_names.len(),
                operation.signature.len()
            ),
        ));
    }
    if operation.signature.types().iter().any(TypeTag::is_void) {
        return Err(Error::invalid_metadata(
            type_name,
            &operation.name,
            "parameter cannot be void",
        ));
    }
    Ok(())
}

fn operation_from_method<T: 'static>(
    method: &MethodDecl<T>,
    description: String,
    parameter_names: Vec<String>,
) -> OperationDecl<T> {
    OperationDecl {
        name: method.name.clone(),
        description,
        signature: method.params.clone(),
        parameter_names,
        return_type: method.returns.clone(),
        body: method.body.clone(),
    }
}

/// Tracks member names already seen while walking a lineage.
///
/// A name seen in a more-derived shape hides the same name in ancestors;
/// a name repeated within one shape is a declaration error.
struct Visibility {
    fields: HashSet<String>,
    methods: HashSet<OperationKey>,
}

impl Visibility {
    fn new() -> Self {
        Self {
            fields: HashSet::new(),
            methods: HashSet::new(),
        }
    }

    /// Filter one shape's fields, most-derived wins.
    fn fields<'s, T>(
        &mut self,
        shape: &'s TypeShape<T>,
    ) -> Result<Vec<&'s FieldDecl<T>>, Error> {
        let mut local = HashSet::new();
        let mut visible = Vec::new();
        for field in &shape.fields {
            if !local.insert(field.name.as_str()) {
                return Err(Error::invalid_metadata(
                    &shape.type_name,
                    &field.name,
                    "field declared twice",
                ));
            }
            if self.fields.contains(&field.name) {
                continue;
            }
            visible.push(field);
        }
        self.fields.extend(local.into_iter().map(str::to_string));
        Ok(visible)
    }

    /// Filter one shape's methods by (name, parameter types), most-derived wins.
    fn methods<'s, T>(
        &mut self,
        shape: &'s TypeShape<T>,
    ) -> Result<Vec<&'s MethodDecl<T>>, Error> {
        let mut local = HashSet::new();
        let mut visible = Vec::new();
        for method in &shape.methods {
            let key = OperationKey {
                name: method.name.clone(),
                signature: method.params.clone(),
            };
            if self.methods.contains(&key) {
                continue;
            }
            if !local.insert(key.clone()) {
                return Err(Error::invalid_metadata(
                    &shape.type_name,
                    &key.to_string(),
                    "method declared twice",
                ));
            }
            visible.push(method);
        }
        self.methods.extend(local);
        Ok(visible)
    }
}

/// Annotation-driven discovery over a shape and its ancestors.
pub fn annotated<T: 'static>(shape: &TypeShape<T>) -> Result<Members<T>, Error> {
    let type_name = shape.type_name.as_str();
    let mut attributes = AttributeSet::new(type_name, Strictness::Strict);
    let mut operations = OperationSet::new(type_name);
    let mut visibility = Visibility::new();

    for level in shape.lineage() {
        for field in visibility.fields(level)? {
            if let Some(marker) = &field.marker {
                attributes.add_field(field, marker.readable, marker.writable, &marker.description)?;
            }
        }

        for method in visibility.methods(level)? {
            match &method.marker {
                None => {}
                Some(Marker::Attribute(marker)) => {
                    let accessor = classify_accessor(method, false).map_err(|message| {
                        Error::invalid_metadata(type_name, &method.name, message)
                    })?;
                    attributes.add_accessor(method, accessor, &marker.description)?;
                }
                Some(Marker::Operation(marker)) => {
                    if accessor_name(&method.name, false).is_some() {
                        return Err(Error::invalid_metadata(
                            type_name,
                            &method.name,
                            "operation names may not start with get or set",
                        ));
                    }
                    operations.add(operation_from_method(
                        method,
                        marker.description.clone(),
                        marker.parameter_names.clone(),
                    ))?;
                }
            }
        }
    }

    Ok(Members {
        attributes: attributes.finish()?,
        operations: operations.operations,
    })
}

/// Validate the members a self-describing target lists for itself.
pub fn self_described<T: SelfDescribing>(type_name: &str, target: &T) -> Result<Members<T>, Error> {
    let members = target.describe();

    let mut names = HashSet::new();
    for attribute in &members.attributes {
        if attribute.name.is_empty() {
            return Err(Error::invalid_metadata(type_name, "<unnamed>", "attribute has no name"));
        }
        if attribute.read.is_none() && attribute.write.is_none() {
            return Err(Error::invalid_metadata(
                type_name,
                &attribute.name,
                "attribute is neither readable nor writable",
            ));
        }
        if !names.insert(attribute.name.as_str()) {
            return Err(Error::invalid_metadata(
                type_name,
                &attribute.name,
                "attribute declared twice",
            ));
        }
    }

    let mut keys = HashSet::new();
    for operation in &members.operations {
        check_operation(type_name, operation)?;
        let key = OperationKey {
            name: operation.name.clone(),
            signature: operation.signature.clone(),
        };
        if !keys.insert(key.clone()) {
            return Err(Error::invalid_metadata(
                type_name,
                &key.to_string(),
                "operation declared twice with the same signature",
            ));
        }
    }

    Ok(members)
}

/// Caller-supplied members for a target that declares nothing itself.
pub struct Explicit<T> {
    /// Each field becomes an attribute.
    pub fields: Vec<FieldDecl<T>>,
    /// Accessor methods, paired into attributes by logical name.
    pub accessors: Vec<MethodDecl<T>>,
    pub operations: Vec<OperationDecl<T>>,
    strictness: Strictness,
}

impl<T: 'static> Explicit<T> {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            accessors: Vec::new(),
            operations: Vec::new(),
            strictness: Strictness::Strict,
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn accessor(mut self, method: MethodDecl<T>) -> Self {
        self.accessors.push(method);
        self
    }

    #[must_use]
    pub fn operation(mut self, operation: OperationDecl<T>) -> Self {
        self.operations.push(operation);
        self
    }

    /// Publish every public member of `shape`.
    ///
    /// Public fields become attributes, writable unless constant. Public
    /// `isX`/`getX`/`setX` methods pair into attributes; every other public
    /// method becomes an operation, apart from [`EXCLUDED_METHODS`]. A name
    /// found in a derived shape hides the same name further up.
    pub fn all_public(shape: &TypeShape<T>) -> Result<Self, Error> {
        let mut explicit = Self::new();
        explicit.strictness = Strictness::Lenient;
        let mut visibility = Visibility::new();

        for level in shape.lineage() {
            for field in visibility.fields(level)? {
                if !field.public {
                    continue;
                }
                let writable = !field.constant && field.write.is_some();
                let mut field = field.clone();
                field.marker = Some(AttributeMarker::new("").writable(writable));
                explicit.fields.push(field);
            }

            for method in visibility.methods(level)? {
                if !method.public || EXCLUDED_METHODS.contains(&method.name.as_str()) {
                    continue;
                }
                match classify_accessor(method, true) {
                    Ok(_) => explicit.accessors.push(method.clone()),
                    Err(reason) => {
                        if accessor_name(&method.name, true).is_some() {
                            tracing::debug!(
                                type_name = %shape.type_name,
                                member = %method.name,
                                %reason,
                                "publishing malformed accessor as operation"
                            );
                        }
                        explicit
                            .operations
                            .push(operation_from_method(method, String::new(), Vec::new()));
                    }
                }
            }
        }

        Ok(explicit)
    }
}

impl<T: 'static> Default for Explicit<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Discovery over caller-supplied members.
pub fn explicit<T: 'static>(type_name: &str, explicit: Explicit<T>) -> Result<Members<T>, Error> {
    let mut attributes = AttributeSet::new(type_name, explicit.strictness);
    let mut operations = OperationSet::new(type_name);

    for field in &explicit.fields {
        let (readable, writable, description) = match &field.marker {
            Some(marker) => (marker.readable, marker.writable, marker.description.as_str()),
            None => (true, !field.constant && field.write.is_some(), ""),
        };
        attributes.add_field(field, readable, writable, description)?;
    }

    for method in &explicit.accessors {
        let description = match &method.marker {
            Some(Marker::Attribute(marker)) => marker.description.as_str(),
            _ => "",
        };
        match classify_accessor(method, true) {
            Ok(accessor) => attributes.add_accessor(method, accessor, description)?,
            Err(message) => attributes.reject(&method.name, message)?,
        }
    }

    for operation in explicit.operations {
        operations.add(operation)?;
    }

    Ok(Members {
        attributes: attributes.finish()?,
        operations: operations.operations,
    })
}
