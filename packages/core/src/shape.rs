//! Declared type shapes: the members a type exposes to discovery.
//!
//! A `TypeShape<T>` lists a type's fields and methods with their types,
//! visibility and optional markers, and may extend a parent shape reached
//! through a projection (`&T -> &P`). Discovery reads a shape once and
//! never looks at it again.

use std::sync::Arc;

use crate::descriptor::Signature;
use crate::error::BoxError;
use crate::name::NameSpec;
use crate::types::TypeTag;
use crate::value::Value;

/// Reads a value from a target.
pub type Getter<T> = Arc<dyn Fn(&T) -> Result<Value, BoxError> + Send + Sync>;
/// Writes a value into a target.
pub type Setter<T> = Arc<dyn Fn(&T, Value) -> Result<(), BoxError> + Send + Sync>;
/// Runs a method on a target with positional arguments.
pub type Body<T> = Arc<dyn Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Projection from a type to an embedded parent.
pub type Projection<T, P> = Arc<dyn Fn(&T) -> &P + Send + Sync>;

/// Marks a field or accessor method as an attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMarker {
    pub description: String,
    /// Only consulted for fields; accessors derive access from getter/setter.
    pub readable: bool,
    pub writable: bool,
}

impl AttributeMarker {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            readable: true,
            writable: false,
        }
    }

    #[must_use]
    pub fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    #[must_use]
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }
}

/// Marks a method as an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationMarker {
    pub description: String,
    pub parameter_names: Vec<String>,
}

impl OperationMarker {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            parameter_names: Vec::new(),
        }
    }

    #[must_use]
    pub fn parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Marker carried by a method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    Attribute(AttributeMarker),
    Operation(OperationMarker),
}

/// A declared field.
pub struct FieldDecl<T> {
    pub name: String,
    pub type_tag: TypeTag,
    pub public: bool,
    /// Constant fields are never written.
    pub constant: bool,
    pub marker: Option<AttributeMarker>,
    pub read: Getter<T>,
    pub write: Option<Setter<T>>,
}

impl<T: 'static> FieldDecl<T> {
    /// A public, read-only field.
    pub fn new<F>(name: impl Into<String>, type_tag: TypeTag, read: F) -> Self
    where
        F: Fn(&T) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            type_tag,
            public: true,
            constant: false,
            marker: None,
            read: Arc::new(read),
            write: None,
        }
    }

    /// Give the field write access.
    #[must_use]
    pub fn write<F>(mut self, write: F) -> Self
    where
        F: Fn(&T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(write));
        self
    }

    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    #[must_use]
    pub fn attribute(mut self, marker: AttributeMarker) -> Self {
        self.marker = Some(marker);
        self
    }
}

impl<T> Clone for FieldDecl<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            type_tag: self.type_tag.clone(),
            public: self.public,
            constant: self.constant,
            marker: self.marker.clone(),
            read: Arc::clone(&self.read),
            write: self.write.clone(),
        }
    }
}

/// A declared method.
pub struct MethodDecl<T> {
    pub name: String,
    pub params: Signature,
    pub returns: TypeTag,
    pub public: bool,
    pub marker: Option<Marker>,
    pub body: Body<T>,
}

impl<T: 'static> MethodDecl<T> {
    pub fn new<F>(
        name: impl Into<String>,
        params: impl Into<Signature>,
        returns: TypeTag,
        body: F,
    ) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.into(),
            returns,
            public: true,
            marker: None,
            body: Arc::new(body),
        }
    }

    /// A zero-argument method returning `returns`.
    pub fn getter<F>(name: impl Into<String>, returns: TypeTag, read: F) -> Self
    where
        F: Fn(&T) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::new(name, Signature::empty(), returns, move |target, _| read(target))
    }

    /// A one-argument void method.
    pub fn setter<F>(name: impl Into<String>, param: TypeTag, write: F) -> Self
    where
        F: Fn(&T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(name, vec![param], TypeTag::Void, move |target, args| {
            let value = args.first().cloned().unwrap_or_default();
            write(target, value)?;
            Ok(Value::Null)
        })
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    #[must_use]
    pub fn attribute(mut self, marker: AttributeMarker) -> Self {
        self.marker = Some(Marker::Attribute(marker));
        self
    }

    #[must_use]
    pub fn operation(mut self, marker: OperationMarker) -> Self {
        self.marker = Some(Marker::Operation(marker));
        self
    }
}

impl<T> Clone for MethodDecl<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            returns: self.returns.clone(),
            public: self.public,
            marker: self.marker.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

/// The declared members of a type, with an optional parent.
pub struct TypeShape<T> {
    pub type_name: String,
    /// Declarative naming metadata, the type-level marker.
    pub naming: Option<NameSpec>,
    pub fields: Vec<FieldDecl<T>>,
    pub methods: Vec<MethodDecl<T>>,
    pub parent: Option<Box<TypeShape<T>>>,
}

impl<T: 'static> TypeShape<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            naming: None,
            fields: Vec::new(),
            methods: Vec::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn naming(mut self, spec: NameSpec) -> Self {
        self.naming = Some(spec);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDecl<T>) -> Self {
        self.methods.push(method);
        self
    }

    /// Extend a parent shape embedded in `T`, reached through `project`.
    #[must_use]
    pub fn extends<P: 'static, F>(mut self, parent: TypeShape<P>, project: F) -> Self
    where
        F: Fn(&T) -> &P + Send + Sync + 'static,
    {
        let project: Projection<T, P> = Arc::new(project);
        self.parent = Some(Box::new(parent.project(project)));
        self
    }

    fn project<C: 'static>(self, project: Projection<C, T>) -> TypeShape<C> {
        TypeShape {
            type_name: self.type_name,
            naming: self.naming,
            fields: self
                .fields
                .into_iter()
                .map(|f| project_field(f, Arc::clone(&project)))
                .collect(),
            methods: self
                .methods
                .into_iter()
                .map(|m| project_method(m, Arc::clone(&project)))
                .collect(),
            parent: self
                .parent
                .map(|p| Box::new((*p).project(Arc::clone(&project)))),
        }
    }

    /// This shape followed by its ancestors, most-derived first.
    pub fn lineage(&self) -> Lineage<'_, T> {
        Lineage { next: Some(self) }
    }

    /// Nearest declarative naming in the lineage.
    pub fn resolved_naming(&self) -> Option<&NameSpec> {
        self.lineage().find_map(|shape| shape.naming.as_ref())
    }
}

/// Iterator over a shape and its ancestors.
pub struct Lineage<'a, T> {
    next: Option<&'a TypeShape<T>>,
}

impl<'a, T> Iterator for Lineage<'a, T> {
    type Item = &'a TypeShape<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

fn project_field<C: 'static, P: 'static>(
    field: FieldDecl<P>,
    project: Projection<C, P>,
) -> FieldDecl<C> {
    let read = field.read;
    let read_project = Arc::clone(&project);
    FieldDecl {
        name: field.name,
        type_tag: field.type_tag,
        public: field.public,
        constant: field.constant,
        marker: field.marker,
        read: Arc::new(move |target: &C| read(read_project(target))),
        write: field.write.map(|write| -> Setter<C> {
            Arc::new(move |target: &C, value: Value| write(project(target), value))
        }),
    }
}

fn project_method<C: 'static, P: 'static>(
    method: MethodDecl<P>,
    project: Projection<C, P>,
) -> MethodDecl<C> {
    let body = method.body;
    MethodDecl {
        name: method.name,
        params: method.params,
        returns: method.returns,
        public: method.public,
        marker: method.marker,
        body: Arc::new(move |target: &C, args: &[Value]| body(project(target), args)),
    }
}

/// An attribute ready to be bound to a target.
pub struct AttributeDecl<T> {
    pub name: String,
    pub description: String,
    pub type_tag: TypeTag,
    pub read: Option<Getter<T>>,
    pub write: Option<Setter<T>>,
}

impl<T: 'static> AttributeDecl<T> {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            type_tag,
            read: None,
            write: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn read<F>(mut self, read: F) -> Self
    where
        F: Fn(&T) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(read));
        self
    }

    #[must_use]
    pub fn write<F>(mut self, write: F) -> Self
    where
        F: Fn(&T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(write));
        self
    }
}

/// An operation ready to be bound to a target.
pub struct OperationDecl<T> {
    pub name: String,
    pub description: String,
    pub signature: Signature,
    pub parameter_names: Vec<String>,
    pub return_type: TypeTag,
    pub body: Body<T>,
}

impl<T: 'static> OperationDecl<T> {
    pub fn new<F>(
        name: impl Into<String>,
        signature: impl Into<Signature>,
        return_type: TypeTag,
        body: F,
    ) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            signature: signature.into(),
            parameter_names: Vec::new(),
            return_type,
            body: Arc::new(body),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Discovered members of one type, not yet bound to a target.
pub struct Members<T> {
    pub attributes: Vec<AttributeDecl<T>>,
    pub operations: Vec<OperationDecl<T>>,
}

impl<T> Members<T> {
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDecl<T>) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn operation(mut self, operation: OperationDecl<T>) -> Self {
        self.operations.push(operation);
        self
    }
}

impl<T> Default for Members<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base {
        id: i64,
    }

    struct Derived {
        base: Base,
        label: String,
    }

    fn base_shape() -> TypeShape<Base> {
        TypeShape::new("Base")
            .naming(NameSpec::domain("app"))
            .field(FieldDecl::new("id", TypeTag::Long, |b: &Base| Ok(Value::Long(b.id))))
            .method(MethodDecl::getter("getId", TypeTag::Long, |b: &Base| {
                Ok(Value::Long(b.id))
            }))
    }

    #[test]
    fn lineage_is_most_derived_first() {
        let shape = TypeShape::<Derived>::new("Derived")
            .field(FieldDecl::new("label", TypeTag::String, |d: &Derived| {
                Ok(Value::from(d.label.as_str()))
            }))
            .extends(base_shape(), |d: &Derived| &d.base);

        let names: Vec<&str> = shape.lineage().map(|s| s.type_name.as_str()).collect();
        assert_eq!(names, vec!["Derived", "Base"]);
    }

    #[test]
    fn projected_members_read_through_parent() {
        let shape = TypeShape::<Derived>::new("Derived").extends(base_shape(), |d: &Derived| &d.base);
        let target = Derived {
            base: Base { id: 7 },
            label: "x".to_string(),
        };

        let parent = shape.parent.as_ref().unwrap();
        let field = &parent.fields[0];
        assert_eq!((field.read)(&target).unwrap(), Value::Long(7));

        let method = &parent.methods[0];
        assert_eq!((method.body)(&target, &[]).unwrap(), Value::Long(7));
    }

    #[test]
    fn naming_resolves_from_nearest_ancestor() {
        let shape = TypeShape::<Derived>::new("Derived").extends(base_shape(), |d: &Derived| &d.base);
        assert_eq!(shape.resolved_naming(), Some(&NameSpec::domain("app")));

        let shape = TypeShape::<Derived>::new("Derived")
            .naming(NameSpec::domain("own"))
            .extends(base_shape(), |d: &Derived| &d.base);
        assert_eq!(shape.resolved_naming(), Some(&NameSpec::domain("own")));
    }

    #[test]
    fn setter_body_returns_null() {
        use std::sync::atomic::{AtomicI32, Ordering};

        struct Cell(AtomicI32);
        let method = MethodDecl::setter("setSize", TypeTag::Int, |c: &Cell, v: Value| {
            c.0.store(i32::try_from(v)?, Ordering::SeqCst);
            Ok(())
        });
        let cell = Cell(AtomicI32::new(0));
        assert_eq!((method.body)(&cell, &[Value::Int(4)]).unwrap(), Value::Null);
        assert_eq!(cell.0.load(Ordering::SeqCst), 4);
        assert_eq!(method.returns, TypeTag::Void);
        assert_eq!(method.params, Signature::from([TypeTag::Int]));
    }
}
