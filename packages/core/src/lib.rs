//! Core management layer: publish live objects under hierarchical names
//! and reach their attributes and operations by name at runtime.
//!
//! - `ManagedName`: `domain:key=value,...,name=leaf`, built by `NameBuilder`
//!   from declarative `NameSpec` metadata and optional self-naming
//! - Discovery: turns a declared `TypeShape`, a `SelfDescribing` target, or
//!   `Explicit` members into attribute and operation sets
//! - `Dispatcher`: get, set and invoke against one bound target
//! - `Registry`: the name to dispatcher table, with start/stop and a
//!   pluggable `Transport`
//! - `Client`: text-in front end with per-object metadata caching
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use mgmt_core::{
//!     AttributeMarker, Managed, MethodDecl, NameSpec, Registry, TypeShape, TypeTag, Value,
//! };
//!
//! struct Pool {
//!     size: AtomicI32,
//! }
//!
//! impl Managed for Pool {
//!     fn shape() -> TypeShape<Self> {
//!         TypeShape::new("Pool")
//!             .naming(NameSpec::domain("app"))
//!             .method(
//!                 MethodDecl::getter("getSize", TypeTag::Int, |p: &Pool| {
//!                     Ok(Value::Int(p.size.load(Ordering::SeqCst)))
//!                 })
//!                 .attribute(AttributeMarker::new("connections in the pool")),
//!             )
//!     }
//! }
//!
//! let registry = Registry::default();
//! let name = registry.register(Arc::new(Pool { size: AtomicI32::new(8) })).unwrap();
//! assert_eq!(name.to_string(), "app:name=Pool");
//!
//! let size = registry.dispatcher(&name).unwrap().get_attribute("size").unwrap();
//! assert_eq!(size, Value::Int(8));
//! ```

mod client;
mod coerce;
mod descriptor;
pub mod discover;
mod dispatcher;
mod error;
mod name;
mod registry;
mod shape;
mod types;
mod value;

pub use client::{Client, OperationRef};
pub use coerce::{CoercionError, Constructor, TypeRegistry};
pub use descriptor::{
    AttributeDescriptor, AttributeInfo, BeanInfo, BoundGetter, BoundInvoker, BoundSetter,
    OperationDescriptor, OperationInfo, OperationKey, Signature,
};
pub use discover::{Explicit, Managed, SelfDescribing};
pub use dispatcher::{BatchResult, Dispatcher};
pub use error::{format_chain, BoxError, Chain, Error};
pub use name::{
    expand_folders, simple_type_name, Folder, ManagedName, NameBuilder, NamePattern, NameSpec,
    SelfNaming, LEAF_KEY,
};
pub use registry::{
    Connection, LocalTransport, Registry, RegistryConfig, Transport, UnregisterMode,
    UNREGISTER_ENV,
};
pub use shape::{
    AttributeDecl, AttributeMarker, Body, FieldDecl, Getter, Lineage, Marker, Members,
    MethodDecl, OperationDecl, OperationMarker, Setter, TypeShape,
};
pub use types::TypeTag;
pub use value::{Object, ObjectValue, Value};
