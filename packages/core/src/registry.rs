//! The registry facade: name, discover, bind and publish.
//!
//! Registration is all-or-nothing. The name and members are computed
//! before the table lock is taken; the duplicate check, the transport bind
//! and the insert then happen under one write lock.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::coerce::TypeRegistry;
use crate::descriptor::{BeanInfo, Signature};
use crate::discover::{self, Explicit, Managed, SelfDescribing};
use crate::dispatcher::{BatchResult, Dispatcher};
use crate::error::{BoxError, Error};
use crate::name::{simple_type_name, ManagedName, NameBuilder, NamePattern, NameSpec};
use crate::value::Value;

/// Environment variable overriding the default unregistration mode.
pub const UNREGISTER_ENV: &str = "MGMT_UNREGISTER";

/// How unregistering an unknown name is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnregisterMode {
    /// Unknown names fail with `NotRegistered`.
    Strict,
    /// Unknown names are ignored.
    #[default]
    Lenient,
}

impl FromStr for UnregisterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(UnregisterMode::Strict),
            "lenient" => Ok(UnregisterMode::Lenient),
            other => Err(Error::configuration(format!(
                "unknown unregister mode '{}', expected strict or lenient",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub unregister: UnregisterMode,
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid registry config: {}", e)))
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of this config.
    pub fn with_env(mut self) -> Result<Self, Error> {
        if let Ok(mode) = std::env::var(UNREGISTER_ENV) {
            self.unregister = mode.parse()?;
        }
        Ok(self)
    }
}

/// Receives (name, dispatcher) bindings for remote access.
pub trait Transport: Send + Sync {
    fn bind(&self, name: &ManagedName, dispatcher: Arc<Dispatcher>) -> Result<(), BoxError>;

    fn unbind(&self, name: &ManagedName) -> Result<(), BoxError>;
}

/// In-process transport; bindings are only reachable through the registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

impl Transport for LocalTransport {
    fn bind(&self, _name: &ManagedName, _dispatcher: Arc<Dispatcher>) -> Result<(), BoxError> {
        Ok(())
    }

    fn unbind(&self, _name: &ManagedName) -> Result<(), BoxError> {
        Ok(())
    }
}

struct Table {
    running: bool,
    entries: BTreeMap<ManagedName, Arc<Dispatcher>>,
}

/// Name to dispatcher table with explicit start and stop.
pub struct Registry {
    config: RegistryConfig,
    types: Arc<TypeRegistry>,
    transport: Arc<dyn Transport>,
    table: RwLock<Table>,
}

impl Registry {
    /// A running registry over the local transport.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_transport(config, Arc::new(LocalTransport))
    }

    pub fn with_transport(config: RegistryConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            types: Arc::new(TypeRegistry::new()),
            transport,
            table: RwLock::new(Table {
                running: true,
                entries: BTreeMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Object types used when coercing string values.
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-open a stopped registry with an empty table.
    pub fn start(&self) {
        let mut table = self.write();
        if !table.running {
            table.running = true;
            tracing::debug!("registry started");
        }
    }

    /// Unbind every entry and reject further calls.
    pub fn stop(&self) {
        let mut table = self.write();
        if !table.running {
            return;
        }
        table.running = false;
        for name in std::mem::take(&mut table.entries).into_keys() {
            if let Err(error) = self.transport.unbind(&name) {
                tracing::warn!(%name, %error, "transport unbind failed during stop");
            }
        }
        tracing::debug!("registry stopped");
    }

    pub fn is_running(&self) -> bool {
        self.read().running
    }

    /// Register a type that declares its members with markers.
    pub fn register<T: Managed>(&self, target: Arc<T>) -> Result<ManagedName, Error> {
        let shape = T::shape();
        let name = managed_name(&*target, &shape)?;
        let members = discover::annotated(&shape)?;
        let dispatcher = Dispatcher::bind(name, &shape.type_name, target, members, self.types.clone());
        self.publish(dispatcher)
    }

    /// Register a type that lists its own members.
    pub fn register_self_describing<T: SelfDescribing>(
        &self,
        target: Arc<T>,
    ) -> Result<ManagedName, Error> {
        let type_name = simple_type_name::<T>();
        let name = self_described_name(&*target)?;
        let members = discover::self_described(type_name, &*target)?;
        let dispatcher = Dispatcher::bind(name, type_name, target, members, self.types.clone());
        self.publish(dispatcher)
    }

    /// Register an arbitrary value with caller-supplied members.
    pub fn register_explicit<T: Send + Sync + 'static>(
        &self,
        target: Arc<T>,
        naming: &NameSpec,
        members: Explicit<T>,
    ) -> Result<ManagedName, Error> {
        let type_name = simple_type_name::<T>();
        let name = naming.to_name(type_name)?;
        let members = discover::explicit(type_name, members)?;
        let dispatcher = Dispatcher::bind(name, type_name, target, members, self.types.clone());
        self.publish(dispatcher)
    }

    fn publish(&self, dispatcher: Dispatcher) -> Result<ManagedName, Error> {
        let name = dispatcher.name().clone();
        let dispatcher = Arc::new(dispatcher);

        let mut table = self.write();
        if !table.running {
            return Err(Error::Stopped);
        }
        if table.entries.contains_key(&name) {
            return Err(Error::DuplicateName { name });
        }
        self.transport
            .bind(&name, Arc::clone(&dispatcher))
            .map_err(|source| Error::Transport {
                name: name.clone(),
                source,
            })?;
        table.entries.insert(name.clone(), dispatcher);
        drop(table);

        tracing::debug!(%name, "registered");
        Ok(name)
    }

    /// Unregister a marker-declared object, recomputing its name.
    pub fn unregister<T: Managed>(&self, target: &T) -> Result<(), Error> {
        self.unregister_with(target, self.config.unregister)
    }

    pub fn unregister_with<T: Managed>(&self, target: &T, mode: UnregisterMode) -> Result<(), Error> {
        let name = managed_name(target, &T::shape())?;
        self.unregister_name_with(&name, mode)
    }

    pub fn unregister_self_describing<T: SelfDescribing>(&self, target: &T) -> Result<(), Error> {
        self.unregister_self_describing_with(target, self.config.unregister)
    }

    pub fn unregister_self_describing_with<T: SelfDescribing>(
        &self,
        target: &T,
        mode: UnregisterMode,
    ) -> Result<(), Error> {
        let name = self_described_name(target)?;
        self.unregister_name_with(&name, mode)
    }

    /// Unregister an explicitly described `T`, recomputing its name.
    pub fn unregister_explicit<T: 'static>(&self, naming: &NameSpec) -> Result<(), Error> {
        let name = naming.to_name(simple_type_name::<T>())?;
        self.unregister_name(&name)
    }

    pub fn unregister_name(&self, name: &ManagedName) -> Result<(), Error> {
        self.unregister_name_with(name, self.config.unregister)
    }

    pub fn unregister_name_with(&self, name: &ManagedName, mode: UnregisterMode) -> Result<(), Error> {
        let mut table = self.write();
        if !table.running {
            // stop() already unbound everything
            return match mode {
                UnregisterMode::Strict => Err(Error::Stopped),
                UnregisterMode::Lenient => Ok(()),
            };
        }
        if table.entries.remove(name).is_none() {
            return match mode {
                UnregisterMode::Strict => Err(Error::NotRegistered { name: name.clone() }),
                UnregisterMode::Lenient => {
                    tracing::debug!(%name, "ignoring unregister of unknown name");
                    Ok(())
                }
            };
        }
        if let Err(error) = self.transport.unbind(name) {
            tracing::warn!(%name, %error, "transport unbind failed");
        }
        drop(table);

        tracing::debug!(%name, "unregistered");
        Ok(())
    }

    pub fn contains(&self, name: &ManagedName) -> bool {
        self.read().entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Registered names matching `pattern`, in sorted order.
    pub fn names(&self, pattern: &NamePattern) -> Vec<ManagedName> {
        self.read()
            .entries
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect()
    }

    pub fn dispatcher(&self, name: &ManagedName) -> Result<Arc<Dispatcher>, Error> {
        let table = self.read();
        if !table.running {
            return Err(Error::Stopped);
        }
        table
            .entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotRegistered { name: name.clone() })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.read();
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("running", &table.running)
            .field("entries", &table.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn managed_name<T: Managed>(
    target: &T,
    shape: &crate::shape::TypeShape<T>,
) -> Result<ManagedName, Error> {
    let spec = shape.resolved_naming().cloned().unwrap_or_default();
    NameBuilder::new(&spec)
        .self_naming(target.self_naming())
        .build(&shape.type_name)
}

fn self_described_name<T: SelfDescribing>(target: &T) -> Result<ManagedName, Error> {
    let spec = target.naming();
    NameBuilder::new(&spec)
        .self_naming(target.self_naming())
        .build(simple_type_name::<T>())
}

/// Access to registered objects, local or remote.
pub trait Connection {
    fn names(&self, pattern: &NamePattern) -> Result<Vec<ManagedName>, Error>;

    fn info(&self, name: &ManagedName) -> Result<BeanInfo, Error>;

    fn get_attribute(&self, name: &ManagedName, attribute: &str) -> Result<Value, Error>;

    fn get_attributes(
        &self,
        name: &ManagedName,
        attributes: &[String],
    ) -> Result<BatchResult<Value>, Error>;

    fn set_attribute(&self, name: &ManagedName, attribute: &str, value: Value) -> Result<(), Error>;

    fn set_attributes(
        &self,
        name: &ManagedName,
        values: Vec<(String, Value)>,
    ) -> Result<BatchResult<()>, Error>;

    fn invoke(
        &self,
        name: &ManagedName,
        operation: &str,
        args: &[Value],
        signature: &Signature,
    ) -> Result<Value, Error>;
}

impl Connection for Registry {
    fn names(&self, pattern: &NamePattern) -> Result<Vec<ManagedName>, Error> {
        if !self.is_running() {
            return Err(Error::Stopped);
        }
        Ok(Registry::names(self, pattern))
    }

    fn info(&self, name: &ManagedName) -> Result<BeanInfo, Error> {
        Ok(self.dispatcher(name)?.info())
    }

    fn get_attribute(&self, name: &ManagedName, attribute: &str) -> Result<Value, Error> {
        self.dispatcher(name)?.get_attribute(attribute)
    }

    fn get_attributes(
        &self,
        name: &ManagedName,
        attributes: &[String],
    ) -> Result<BatchResult<Value>, Error> {
        Ok(self.dispatcher(name)?.get_attributes(attributes))
    }

    fn set_attribute(&self, name: &ManagedName, attribute: &str, value: Value) -> Result<(), Error> {
        self.dispatcher(name)?.set_attribute(attribute, value)
    }

    fn set_attributes(
        &self,
        name: &ManagedName,
        values: Vec<(String, Value)>,
    ) -> Result<BatchResult<()>, Error> {
        Ok(self.dispatcher(name)?.set_attributes(values))
    }

    fn invoke(
        &self,
        name: &ManagedName,
        operation: &str,
        args: &[Value],
        signature: &Signature,
    ) -> Result<Value, Error> {
        self.dispatcher(name)?.invoke(operation, args, signature)
    }
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn names(&self, pattern: &NamePattern) -> Result<Vec<ManagedName>, Error> {
        (**self).names(pattern)
    }

    fn info(&self, name: &ManagedName) -> Result<BeanInfo, Error> {
        (**self).info(name)
    }

    fn get_attribute(&self, name: &ManagedName, attribute: &str) -> Result<Value, Error> {
        (**self).get_attribute(name, attribute)
    }

    fn get_attributes(
        &self,
        name: &ManagedName,
        attributes: &[String],
    ) -> Result<BatchResult<Value>, Error> {
        (**self).get_attributes(name, attributes)
    }

    fn set_attribute(&self, name: &ManagedName, attribute: &str, value: Value) -> Result<(), Error> {
        (**self).set_attribute(name, attribute, value)
    }

    fn set_attributes(
        &self,
        name: &ManagedName,
        values: Vec<(String, Value)>,
    ) -> Result<BatchResult<()>, Error> {
        (**self).set_attributes(name, values)
    }

    fn invoke(
        &self,
        name: &ManagedName,
        operation: &str,
        args: &[Value],
        signature: &Signature,
    ) -> Result<Value, Error> {
        (**self).invoke(name, operation, args, signature)
    }
}
